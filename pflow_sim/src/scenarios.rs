//! Event scenarios exercising the track entity end to end.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// EVT-001: Isolated charged primaries, pure truth weights
    Clean,

    /// EVT-002: Truth weights shared with a second particle, including exact ties
    Contaminated,

    /// EVT-003: Three-prong decays, hierarchy links, then parent removal
    DecayChain,

    /// EVT-004: Neutral particles must never become tracks
    NeutralRejection,

    /// EVT-005: Cluster association and PFO consumption
    ClusterMatching,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Clean,
            ScenarioId::Contaminated,
            ScenarioId::DecayChain,
            ScenarioId::NeutralRejection,
            ScenarioId::ClusterMatching,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Clean => "clean",
            ScenarioId::Contaminated => "contaminated",
            ScenarioId::DecayChain => "decay_chain",
            ScenarioId::NeutralRejection => "neutral_rejection",
            ScenarioId::ClusterMatching => "cluster_matching",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Clean => "Charged primaries with single-particle truth, expect 100% matching",
            ScenarioId::Contaminated => "Two-particle truth weights and ties, origin must still win",
            ScenarioId::DecayChain => "Parent/daughter/sibling links survive parent removal as dangling handles",
            ScenarioId::NeutralRejection => "Zero-charge bundles rejected with no partial tracks left behind",
            ScenarioId::ClusterMatching => "One cluster per track, re-association and wrong removal refused",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clean" | "evt-001" => Ok(ScenarioId::Clean),
            "contaminated" | "evt-002" => Ok(ScenarioId::Contaminated),
            "decay_chain" | "decaychain" | "evt-003" => Ok(ScenarioId::DecayChain),
            "neutral_rejection" | "neutralrejection" | "evt-004" => Ok(ScenarioId::NeutralRejection),
            "cluster_matching" | "clustermatching" | "evt-005" => Ok(ScenarioId::ClusterMatching),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
