//! Planner configuration.
//!
//! A `Config` is built once (defaults, then a TOML file, then command line overrides) and
//! passed by reference into every stage. Nothing reads configuration from global state.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

use crate::libs::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fragments: FragmentsConfig,
    pub synthesis: SynthesisConfig,
    pub pcr: PcrConfig,
    pub tools: ToolsConfig,
    /// Source id pattern -> cost of obtaining that source, e.g. `addgene = 65.0`.
    pub acquisition: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FragmentsConfig {
    /// Matches shorter than this are dropped before the search.
    pub min_match: usize,
    /// Budget of real plus synthetic pieces in one assembly.
    pub max_count: usize,
    /// Overlap needed between neighbouring pieces.
    pub min_homology: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub min_length: usize,
    pub max_length: usize,
    /// Price tiers, ascending by `max_length`.
    pub cost: Vec<SynthTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SynthTier {
    pub max_length: usize,
    pub cost: f64,
    /// Flat price for the whole piece; otherwise `cost` is per bp.
    #[serde(default = "default_true")]
    pub fixed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PcrConfig {
    pub bp_cost: f64,
    pub max_pair_penalty: f64,
    /// Identical 3' bases needed before a BLAST hit counts as a binding site.
    pub offtarget_min_bp: usize,
    /// primer3 thermodynamic parameter directory (`PRIMER_THERMODYNAMIC_PARAMETERS_PATH`).
    pub primer3_config: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub primer3: String,
    pub blastn: String,
    pub blastdbcmd: String,
    /// BLAST database holding the match sources. Off-target scanning is skipped without it.
    pub database: Option<String>,
    pub timeout_secs: u64,
    pub parallel: usize,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        let mut acquisition = IndexMap::new();
        acquisition.insert("addgene".to_string(), 65.0);

        Config {
            fragments: FragmentsConfig::default(),
            synthesis: SynthesisConfig::default(),
            pcr: PcrConfig::default(),
            tools: ToolsConfig::default(),
            acquisition,
        }
    }
}

impl Default for FragmentsConfig {
    fn default() -> Self {
        FragmentsConfig {
            min_match: 250,
            max_count: 6,
            min_homology: 20,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        let tier = |max_length, cost| SynthTier {
            max_length,
            cost,
            fixed: true,
        };
        SynthesisConfig {
            min_length: 125,
            max_length: 3000,
            cost: vec![
                tier(500, 89.0),
                tier(750, 129.0),
                tier(1000, 149.0),
                tier(1250, 209.0),
                tier(1500, 249.0),
                tier(1750, 289.0),
                tier(2000, 329.0),
                tier(2250, 399.0),
                tier(2500, 449.0),
                tier(2750, 499.0),
                tier(3000, 549.0),
            ],
        }
    }
}

impl Default for PcrConfig {
    fn default() -> Self {
        PcrConfig {
            bp_cost: 0.6,
            max_pair_penalty: 30.0,
            offtarget_min_bp: 12,
            primer3_config: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            primer3: "primer3_core".to_string(),
            blastn: "blastn".to_string(),
            blastdbcmd: "blastdbcmd".to_string(),
            database: None,
            timeout_secs: 60,
            parallel: 4,
        }
    }
}

/// Command line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub min_match: Option<usize>,
    pub max_count: Option<usize>,
    pub min_homology: Option<usize>,
    pub parallel: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub database: Option<String>,
}

impl Config {
    /// Parse a TOML document; missing sections keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the optional file, then `overrides`.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    })?;
                toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?
            }
            None => Config::default(),
        };

        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(v) = overrides.min_match {
            self.fragments.min_match = v;
        }
        if let Some(v) = overrides.max_count {
            self.fragments.max_count = v;
        }
        if let Some(v) = overrides.min_homology {
            self.fragments.min_homology = v;
        }
        if let Some(v) = overrides.parallel {
            self.tools.parallel = v;
        }
        if let Some(v) = overrides.timeout_secs {
            self.tools.timeout_secs = v;
        }
        if let Some(v) = &overrides.database {
            self.tools.database = Some(v.clone());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, message: &str| ConfigError::ValidationFailed {
            field: field.to_string(),
            message: message.to_string(),
        };

        if self.fragments.max_count == 0 {
            return Err(invalid("fragments.max_count", "must be greater than 0"));
        }
        if self.synthesis.max_length == 0 {
            return Err(invalid("synthesis.max_length", "must be greater than 0"));
        }
        if self.synthesis.min_length > self.synthesis.max_length {
            return Err(invalid(
                "synthesis.min_length",
                "must not exceed synthesis.max_length",
            ));
        }
        if self.synthesis.cost.is_empty() {
            return Err(invalid("synthesis.cost", "needs at least one tier"));
        }
        if self
            .synthesis
            .cost
            .windows(2)
            .any(|w| w[0].max_length >= w[1].max_length)
        {
            return Err(invalid(
                "synthesis.cost",
                "tiers must ascend by max_length",
            ));
        }
        if self.tools.parallel == 0 {
            return Err(invalid("tools.parallel", "must be greater than 0"));
        }
        if self.tools.timeout_secs == 0 {
            return Err(invalid("tools.timeout_secs", "must be greater than 0"));
        }
        Ok(())
    }

    /// Price of synthesizing `length` bp.
    ///
    /// The first tier covering `length` applies. Longer pieces are priced as several
    /// maximal pieces of the last tier.
    pub fn synth_cost(&self, length: usize) -> f64 {
        let tier_price = |tier: &SynthTier, length: usize| {
            if tier.fixed {
                tier.cost
            } else {
                tier.cost * length as f64
            }
        };

        if let Some(tier) = self.synthesis.cost.iter().find(|t| length <= t.max_length) {
            return tier_price(tier, length);
        }

        match self.synthesis.cost.last() {
            Some(last) => {
                let pieces = length.div_ceil(last.max_length);
                pieces as f64 * tier_price(last, last.max_length)
            }
            None => 0.0,
        }
    }

    /// Cost of obtaining the source `id`; free unless an acquisition pattern matches.
    pub fn acquisition_cost(&self, id: &str) -> f64 {
        if let Some(cost) = self.acquisition.get(id) {
            return *cost;
        }

        let lower = id.to_lowercase();
        self.acquisition
            .iter()
            .find(|(pattern, _)| lower.contains(&pattern.to_lowercase()))
            .map(|(_, cost)| *cost)
            .unwrap_or(0.0)
    }
}
