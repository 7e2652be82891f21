//! Runtime configuration.
//!
//! Loaded from a YAML file (see `config/rtdata.example.yaml`) and then
//! overridden from the environment so that credentials never need to live
//! in the file. The resulting [`Config`] value is passed explicitly to every
//! entry point; there is no process-wide configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::bbox::DEFAULT_HALF_WIDTH_M;
use crate::error::{CommonError, CommonResult};

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory where downloads, derived files, plots and the manifest live.
    pub save_path: PathBuf,
    /// File name of the JSON manifest inside `save_path`.
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
    #[serde(default)]
    pub gliders: Vec<GliderConfig>,
    /// WMO numbers of tracked floats.
    #[serde(default)]
    pub floats: Vec<u64>,
    #[serde(default)]
    pub c2: C2Config,
    #[serde(default)]
    pub cmems: CmemsConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

fn default_manifest_name() -> String {
    "cmems_prod_config.json".to_string()
}

/// A glider followed through the C2 API.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GliderConfig {
    /// Platform serial, e.g. "unit_306".
    pub unit: String,
    /// Display name used in KML placemarks.
    pub name: String,
    #[serde(default)]
    pub id: Option<u32>,
    /// KML colour (aabbggrr) for the track line.
    #[serde(default = "default_track_color")]
    pub color: String,
}

fn default_track_color() -> String {
    "ff0000ff".to_string()
}

/// C2 API environment.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum C2Environment {
    #[default]
    Prod,
    Test,
}

impl C2Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            C2Environment::Prod => "https://api.c2.noc.ac.uk",
            C2Environment::Test => "https://api-test.c2.noc.ac.uk",
        }
    }
}

/// C2 API client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct C2Config {
    #[serde(default)]
    pub environment: C2Environment,
    /// Bearer token, normally supplied through `C2_TOKEN`.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_c2_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_c2_retries")]
    pub max_retries: u32,
}

fn default_c2_timeout() -> u64 {
    60
}

fn default_c2_retries() -> u32 {
    3
}

impl Default for C2Config {
    fn default() -> Self {
        Self {
            environment: C2Environment::Prod,
            token: String::new(),
            request_timeout_secs: default_c2_timeout(),
            max_retries: default_c2_retries(),
        }
    }
}

/// A CMEMS product to subset.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CmemsDataset {
    pub id: String,
    pub variables: Vec<String>,
}

/// Copernicus Marine subset download settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CmemsConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_cmems_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_cmems_datasets")]
    pub datasets: Vec<CmemsDataset>,
    /// Half-width of the square drawn around the reference glider.
    #[serde(default = "default_half_width")]
    pub half_width_m: f64,
    #[serde(default)]
    pub min_depth: f64,
    #[serde(default = "default_max_depth")]
    pub max_depth: f64,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: i64,
    #[serde(default = "default_cmems_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_cmems_retries")]
    pub max_retries: u32,
}

fn default_cmems_endpoint() -> String {
    "https://subset.marine.copernicus.eu/subset".to_string()
}

fn default_cmems_datasets() -> Vec<CmemsDataset> {
    vec![
        CmemsDataset {
            id: "cmems_obs-sl_glo_phy-ssh_nrt_allsat-l4-duacs-0.125deg_P1D".to_string(),
            variables: vec!["ugos".to_string(), "vgos".to_string()],
        },
        CmemsDataset {
            id: "cmems_mod_glo_phy-cur_anfc_0.083deg_PT6H-i".to_string(),
            variables: vec!["uo".to_string(), "vo".to_string()],
        },
    ]
}

fn default_half_width() -> f64 {
    DEFAULT_HALF_WIDTH_M
}

fn default_max_depth() -> f64 {
    1100.0
}

fn default_lookback_days() -> i64 {
    3
}

fn default_forecast_days() -> i64 {
    2
}

fn default_cmems_timeout() -> u64 {
    600
}

fn default_cmems_retries() -> u32 {
    5
}

impl Default for CmemsConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            endpoint: default_cmems_endpoint(),
            datasets: default_cmems_datasets(),
            half_width_m: default_half_width(),
            min_depth: 0.0,
            max_depth: default_max_depth(),
            lookback_days: default_lookback_days(),
            forecast_days: default_forecast_days(),
            request_timeout_secs: default_cmems_timeout(),
            max_retries: default_cmems_retries(),
        }
    }
}

/// Current-field reduction settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Substring identifying the model product in the manifest.
    #[serde(default = "default_match_str")]
    pub match_str: String,
    #[serde(default = "default_depth_bin")]
    pub depth_bin_m: f64,
    /// Fall back to the closest depth level instead of failing.
    #[serde(default)]
    pub nearest_depth: bool,
    /// Let a missing sample invalidate the whole column average.
    #[serde(default)]
    pub propagate_nan: bool,
    #[serde(default = "default_current_vars")]
    pub variables: Vec<String>,
}

fn default_match_str() -> String {
    "model_currents.nc".to_string()
}

fn default_depth_bin() -> f64 {
    1000.0
}

fn default_current_vars() -> Vec<String> {
    vec!["uo".to_string(), "vo".to_string()]
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            match_str: default_match_str(),
            depth_bin_m: default_depth_bin(),
            nearest_depth: false,
            propagate_nan: false,
            variables: default_current_vars(),
        }
    }
}

/// Quiver overlay rendering settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    /// Longest image side in pixels.
    #[serde(default = "default_image_pixels")]
    pub image_pixels: u32,
    /// Upper bound of the speed colour scale (m/s).
    #[serde(default = "default_speed_max")]
    pub speed_max: f64,
    /// Metres per second represented by one degree of arrow length.
    #[serde(default = "default_quiver_scale")]
    pub quiver_scale: f64,
}

fn default_image_pixels() -> u32 {
    2048
}

fn default_speed_max() -> f64 {
    0.5
}

fn default_quiver_scale() -> f64 {
    2.0
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            image_pixels: default_image_pixels(),
            speed_max: default_speed_max(),
            quiver_scale: default_quiver_scale(),
        }
    }
}

impl Config {
    /// Load from a YAML file and apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> CommonResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        debug!(path = %path.display(), gliders = config.gliders.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse YAML without consulting the environment.
    pub fn from_yaml_str(content: &str) -> CommonResult<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `C2_TOKEN`, `CMEMS_USERNAME`, `CMEMS_PASSWORD` and
    /// `RTDATA_SAVE_PATH` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("C2_TOKEN") {
            self.c2.token = token;
        }
        if let Some(user) = lookup("CMEMS_USERNAME") {
            self.cmems.username = user;
        }
        if let Some(password) = lookup("CMEMS_PASSWORD") {
            self.cmems.password = password;
        }
        if let Some(path) = lookup("RTDATA_SAVE_PATH") {
            self.save_path = PathBuf::from(path);
        }
    }

    fn validate(&self) -> CommonResult<()> {
        if self.save_path.as_os_str().is_empty() {
            return Err(CommonError::Config("save_path must not be empty".to_string()));
        }
        if self.cmems.min_depth > self.cmems.max_depth {
            return Err(CommonError::Config(format!(
                "cmems.min_depth ({}) exceeds cmems.max_depth ({})",
                self.cmems.min_depth, self.cmems.max_depth
            )));
        }
        if self.overlay.quiver_scale <= 0.0 || self.overlay.speed_max <= 0.0 {
            return Err(CommonError::Config(
                "overlay.quiver_scale and overlay.speed_max must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Full path of the JSON manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.save_path.join(&self.manifest_name)
    }

    /// Directory receiving KMZ overlays.
    pub fn kmz_dir(&self) -> PathBuf {
        self.save_path.join("kmz")
    }
}
