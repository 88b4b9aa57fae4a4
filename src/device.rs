use std::{fmt, path::Path, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

/// Scenario names, indexed by `DeviceConfiguration::scenario`.
pub const SCENARIOS: [&str; 7] = [
    "Haier", "Haier2", "Neotima", "Hillies", "LT 3.0", "LT 4.0", "SS Pattern",
];

/// Home-network vendors, indexed by `DeviceConfiguration::comm_company`.
pub const VENDORS: [&str; 7] = ["CVNET", "HT", "CMX", "KOCOM", "KDONE", "ZIGBANG", "HDCLABS"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid MAC low bytes {0:?}: expected up to 4 hex digits")]
    BadMac(String),
    #[error("{field} out of range: {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("unknown product type: {0}")]
    UnknownProduct(String),
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    #[default]
    LightSwitch,
    OutletSwitch,
    DimmingSwitch,
}

impl ProductType {
    pub fn code(self) -> u8 {
        match self {
            ProductType::LightSwitch => 0x5B,
            ProductType::OutletSwitch => 0x5C,
            ProductType::DimmingSwitch => 0x5D,
        }
    }
}

impl FromStr for ProductType {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" | "light-switch" | "5b" => Ok(ProductType::LightSwitch),
            "outlet" | "outlet-switch" | "5c" => Ok(ProductType::OutletSwitch),
            "dimming" | "dimming-switch" | "5d" => Ok(ProductType::DimmingSwitch),
            _ => Err(ConfigError::UnknownProduct(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DimmingType {
    #[default]
    None,
    Dimming,
    ColorTemp,
}

impl DimmingType {
    pub fn code(self) -> u8 {
        match self {
            DimmingType::None => 0,
            DimmingType::Dimming => 1,
            DimmingType::ColorTemp => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverloadProtection {
    #[default]
    Sum,
    Individual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutletMode {
    #[default]
    Manual,
    Auto,
}

/// Low two bytes of the device MAC, entered as hex. Short input is zero-padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct MacLow(pub [u8; 2]);

impl FromStr for MacLow {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || ConfigError::BadMac(s.to_string());
        if s.len() > 4 || s.len() % 2 != 0 || !s.is_ascii() {
            return Err(bad());
        }
        let mut out = [0u8; 2];
        for (slot, i) in out.iter_mut().zip((0..s.len()).step_by(2)) {
            *slot = u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| bad())?;
        }
        Ok(MacLow(out))
    }
}

impl TryFrom<String> for MacLow {
    type Error = ConfigError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for MacLow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.0[0], self.0[1])
    }
}

/// Everything the configuration packet carries except the timestamp.
/// Missing keys in a config file take the factory defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfiguration {
    pub product_type: ProductType,
    #[serde(rename = "mac_address")]
    pub mac_low: MacLow,
    pub light_circuits: u8,
    pub outlet_circuits: u8,
    pub dimming_type: DimmingType,
    pub delay_time: u8,
    pub sub_id: u8,
    pub ir_present: bool,
    pub three_way: bool,
    pub emergency_call: bool,
    pub sleep_mode: bool,
    pub delay_mode: bool,
    pub scenario: u8,
    pub comm_company: u8,
    pub overload_protection: OverloadProtection,
    pub outlet1_learn_value: u16,
    pub outlet1_current_value: u16,
    pub outlet2_learn_value: u16,
    pub outlet2_current_value: u16,
    pub relay_status: u8,
    pub outlet1_mode: OutletMode,
    pub outlet2_mode: OutletMode,
    pub dimming_value: u8,
    pub color_temp_value: u8,
}

impl Default for DeviceConfiguration {
    fn default() -> Self {
        Self {
            product_type: ProductType::LightSwitch,
            mac_low: MacLow::default(),
            light_circuits: 1,
            outlet_circuits: 0,
            dimming_type: DimmingType::None,
            delay_time: 0,
            sub_id: 0,
            ir_present: false,
            three_way: false,
            emergency_call: false,
            sleep_mode: false,
            delay_mode: false,
            scenario: 0,
            comm_company: 0,
            overload_protection: OverloadProtection::Sum,
            outlet1_learn_value: 0,
            outlet1_current_value: 0,
            outlet2_learn_value: 0,
            outlet2_current_value: 0,
            relay_status: 0,
            outlet1_mode: OutletMode::Manual,
            outlet2_mode: OutletMode::Manual,
            dimming_value: 0,
            color_temp_value: 0,
        }
    }
}

impl DeviceConfiguration {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let cfg = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Rejects fields whose value does not fit the packet's bit layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("light_circuits", self.light_circuits, 1, 4)?;
        check("outlet_circuits", self.outlet_circuits, 0, 2)?;
        check("delay_time", self.delay_time, 0, 5)?;
        check("scenario", self.scenario, 0, SCENARIOS.len() as u8 - 1)?;
        check("comm_company", self.comm_company, 0, VENDORS.len() as u8 - 1)?;
        Ok(())
    }

    pub fn scenario_name(&self) -> Option<&'static str> {
        SCENARIOS.get(self.scenario as usize).copied()
    }

    pub fn vendor_name(&self) -> Option<&'static str> {
        VENDORS.get(self.comm_company as usize).copied()
    }
}

fn check(field: &'static str, value: u8, min: u8, max: u8) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value.into(),
            min: min.into(),
            max: max.into(),
        })
    }
}
