//! Daemon configuration.
//!
//! Read from `sidewinderd.toml`. A missing default file means built-in
//! defaults; anything present must parse and validate completely, there is
//! no partial configuration.

use crate::device::KeyboardModel;
use crate::error::{Error, Result};
use crate::report::Layout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Capabilities of one keyboard model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSpec {
    /// Short identifier, e.g. `sidewinder-x6`.
    pub tag: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub layout: Layout,
    /// USB interface carrying the vendor reports.
    #[serde(default = "default_interface")]
    pub interface: i32,
    pub profiles: usize,
    pub macro_keys: u8,
    /// LED bit per profile, in profile order.
    pub profile_leds: Vec<u8>,
    pub record_led: u8,
    /// Keypad can switch to macro mode (SideWinder X6).
    #[serde(default)]
    pub macro_pad: bool,
}

fn default_interface() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_macro_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sidewinderd")
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root directory of the macro store.
    #[serde(default = "default_macro_dir")]
    pub macro_dir: PathBuf,
    /// Keep recorded timing; when off every step plays back-to-back.
    #[serde(default = "default_true")]
    pub capture_delays: bool,
    /// evdev node to record typed keys from. Discovered when unset.
    #[serde(default)]
    pub capture_device: Option<PathBuf>,
    /// Model entries added to, or replacing (by tag), the built-in table.
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            macro_dir: default_macro_dir(),
            capture_delays: true,
            capture_device: None,
            models: Vec::new(),
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sidewinderd")
            .join("sidewinderd.toml")
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    ///
    /// An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        let config = match std::fs::read_to_string(&path) {
            Ok(text) => {
                info!(path = %path.display(), "Loading configuration");
                Self::parse(&text)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                Self::default()
            }
            Err(e) => return Err(Error::Config(format!("read {}: {e}", path.display()))),
        };
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for spec in &self.models {
            validate_model(spec)?;
        }
        Ok(())
    }

    /// Built-in models, overridden or extended by configured entries.
    pub fn model_table(&self) -> Vec<ModelSpec> {
        let mut table: Vec<ModelSpec> = KeyboardModel::ALL.iter().map(|m| m.spec()).collect();
        for spec in &self.models {
            match table.iter_mut().find(|s| s.tag == spec.tag) {
                Some(existing) => *existing = spec.clone(),
                None => table.push(spec.clone()),
            }
        }
        table
    }
}

/// Check a model entry for internal consistency.
pub fn validate_model(spec: &ModelSpec) -> Result<()> {
    let bad = |msg: String| Err(Error::Config(format!("model '{}': {msg}", spec.tag)));

    if spec.tag.is_empty() {
        return Err(Error::Config("model with empty tag".to_string()));
    }
    if spec.profiles == 0 {
        return bad("profiles must be at least 1".to_string());
    }
    if spec.profile_leds.len() != spec.profiles {
        return bad(format!(
            "{} profile_leds given for {} profiles",
            spec.profile_leds.len(),
            spec.profiles
        ));
    }
    let max_keys = spec.layout.max_macro_keys();
    if !(1..=max_keys).contains(&spec.macro_keys) {
        return bad(format!(
            "macro_keys = {} (allowed 1..={max_keys} for {})",
            spec.macro_keys, spec.layout
        ));
    }
    if !spec.layout.cycles_profiles() && spec.profiles != spec.layout.default_profile_leds().len() {
        return bad(format!(
            "{} selects profiles with dedicated keys and needs exactly {} profiles",
            spec.layout,
            spec.layout.default_profile_leds().len()
        ));
    }

    if spec.macro_pad && spec.layout.macro_pad_led().is_none() {
        return bad(format!("{} has no macro pad", spec.layout));
    }

    let mut leds = spec.profile_leds.clone();
    leds.push(spec.record_led);
    leds.extend(spec.layout.auto_led());
    if spec.macro_pad {
        leds.extend(spec.layout.macro_pad_led());
    }
    if leds.contains(&0) {
        return bad("LED bits must be non-zero".to_string());
    }
    for (i, a) in leds.iter().enumerate() {
        if leds[i + 1..].iter().any(|b| a & b != 0) {
            return bad(format!("LED bit 0x{a:02X} overlaps another indicator"));
        }
    }
    Ok(())
}
