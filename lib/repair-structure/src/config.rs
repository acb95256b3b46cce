//! Every engine knob, under the key names users write.

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use program::instrument::InstrumentOptions;
use search_control::GaParams;
use variant::SemanticCheck;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RepairConfig {
    pub generations: usize,
    pub popsize: usize,
    /// Base mutation probability; scaled per statement by its fault
    /// weight.
    pub mutp: f64,
    /// Force at least this many weight-sampled mutations per individual;
    /// 0 disables.
    pub promut: usize,
    pub subatom_mutp: f64,
    pub subatom_constp: f64,
    pub crossp: f64,
    pub tournament_k: usize,
    pub tournament_p: f64,
    /// Demes in the distributed mode.
    pub num_comps: usize,
    /// Constrain each deme to its share of the statement-id space.
    pub split_search: bool,
    pub diversity_selection: bool,
    pub variants_exchanged: usize,
    pub gen_per_exchange: usize,
    pub semantic_check: SemanticCheck,
    pub uniq_coverage: bool,
    pub multithread_coverage: bool,
    /// Reproduce the historical swap behavior, for replaying old
    /// experiments only.
    pub swap_bug: bool,
    /// Enumerate expression-level candidates in the brute-force mode.
    pub use_subatoms: bool,
    pub positive_path_factor: f64,
    pub seed: u64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            generations: 10,
            popsize: 40,
            mutp: 0.06,
            promut: 1,
            subatom_mutp: 0.0,
            subatom_constp: 0.5,
            crossp: 1.0,
            tournament_k: 2,
            tournament_p: 1.0,
            num_comps: 1,
            split_search: false,
            diversity_selection: false,
            variants_exchanged: 5,
            gen_per_exchange: 5,
            semantic_check: SemanticCheck::Scope,
            uniq_coverage: false,
            multithread_coverage: false,
            swap_bug: false,
            use_subatoms: false,
            positive_path_factor: variant::localization::DEFAULT_POSITIVE_PATH_FACTOR,
            seed: 0,
        }
    }
}

impl RepairConfig {
    /// Read a config from a JSON file; `//` and `/* */` comments are
    /// allowed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let stripped = json_comments::StripComments::new(reader);
        Ok(serde_json::from_reader(stripped)?)
    }

    pub fn ga_params(&self) -> GaParams {
        GaParams {
            generations: self.generations,
            pop_size: self.popsize,
            mut_rate: self.mutp,
            subatom_mut_rate: self.subatom_mutp,
            subatom_const_rate: self.subatom_constp,
            cross_rate: self.crossp,
            pro_mut: self.promut,
            tournament_k: self.tournament_k,
            tournament_p: self.tournament_p,
            split: None,
        }
    }

    pub fn instrument_options(&self) -> InstrumentOptions {
        InstrumentOptions {
            uniq: self.uniq_coverage,
            multithread: self.multithread_coverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_the_documented_spelling() {
        let parsed: RepairConfig = serde_json::from_str(
            r#"{
                "generations": 3,
                "popsize": 8,
                "mutp": 0.5,
                "tournament-k": 4,
                "semantic-check": "none",
                "gen-per-exchange": 2,
                "swap-bug": true
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.generations, 3);
        assert_eq!(parsed.popsize, 8);
        assert_eq!(parsed.tournament_k, 4);
        assert_eq!(parsed.semantic_check, SemanticCheck::None);
        assert_eq!(parsed.gen_per_exchange, 2);
        assert!(parsed.swap_bug);
        // Unset keys fall back to defaults.
        assert_eq!(parsed.crossp, 1.0);
    }
}
