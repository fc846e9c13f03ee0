use serde::{
    Deserialize,
    Serialize,
};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Monanimal {
    #[default]
    Smantha,
    Fake0ne,
    Frycook,
    NadOg,
    Mo,
    Shitposter,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown monanimal: {0}")]
pub struct UnknownMonanimal(pub String);

impl Monanimal {
    pub const ALL: [Monanimal; 6] = [
        Monanimal::Smantha,
        Monanimal::Fake0ne,
        Monanimal::Frycook,
        Monanimal::NadOg,
        Monanimal::Mo,
        Monanimal::Shitposter,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Monanimal::Smantha => "smantha",
            Monanimal::Fake0ne => "fake0ne",
            Monanimal::Frycook => "frycook",
            Monanimal::NadOg => "nad-og",
            Monanimal::Mo => "mo",
            Monanimal::Shitposter => "shitposter",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Monanimal::Smantha => "Smantha",
            Monanimal::Fake0ne => "Fake0ne",
            Monanimal::Frycook => "Frycook",
            Monanimal::NadOg => "Nad-OG",
            Monanimal::Mo => "Mo",
            Monanimal::Shitposter => "Shitposter",
        }
    }

    pub fn speed(self) -> f64 {
        self.stats().0
    }

    pub fn jump(self) -> f64 {
        self.stats().1
    }

    pub fn slide(self) -> f64 {
        self.stats().2
    }

    // (speed, jump, slide)
    fn stats(self) -> (f64, f64, f64) {
        match self {
            Monanimal::Smantha => (1.2, 1.0, 1.1),
            Monanimal::Fake0ne => (1.0, 1.4, 0.8),
            Monanimal::Frycook => (1.4, 0.9, 1.0),
            Monanimal::NadOg => (0.9, 1.2, 1.3),
            Monanimal::Mo => (1.1, 1.1, 1.2),
            Monanimal::Shitposter => (1.3, 1.3, 0.7),
        }
    }
}

impl FromStr for Monanimal {
    type Err = UnknownMonanimal;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Monanimal::ALL
            .into_iter()
            .find(|monanimal| monanimal.id() == id)
            .ok_or_else(|| UnknownMonanimal(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn from_str__round_trips_every_id() {
        for monanimal in Monanimal::ALL {
            assert_eq!(monanimal.id().parse::<Monanimal>(), Ok(monanimal));
        }
    }

    #[test]
    fn from_str__unknown_id__rejected() {
        assert_eq!(
            "invalid".parse::<Monanimal>(),
            Err(UnknownMonanimal("invalid".to_string()))
        );
    }

    #[test]
    fn roster__names_are_unique_and_stats_positive() {
        let names: HashSet<_> = Monanimal::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(names.len(), Monanimal::ALL.len());
        for monanimal in Monanimal::ALL {
            assert!(monanimal.speed() > 0.0);
            assert!(monanimal.jump() > 0.0);
            assert!(monanimal.slide() > 0.0);
        }
    }

    #[test]
    fn roster__frycook_is_fastest_and_fake0ne_jumps_highest() {
        let fastest = Monanimal::ALL
            .into_iter()
            .max_by(|a, b| a.speed().total_cmp(&b.speed()))
            .unwrap();
        let best_jumper = Monanimal::ALL
            .into_iter()
            .max_by(|a, b| a.jump().total_cmp(&b.jump()))
            .unwrap();

        assert_eq!(fastest, Monanimal::Frycook);
        assert_eq!(best_jumper, Monanimal::Fake0ne);
    }
}
