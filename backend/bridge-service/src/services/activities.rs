//! Fixed catalog of community activities, bracketed by city size

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Member-count bracket a city falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CitySize {
    #[serde(rename = "5-15")]
    Seed,
    #[serde(rename = "15-30")]
    Small,
    #[serde(rename = "30-50")]
    Medium,
    #[serde(rename = "50-100")]
    Large,
    #[serde(rename = "100+")]
    Established,
}

impl CitySize {
    pub fn for_member_count(members: i64) -> Self {
        match members {
            m if m < 15 => CitySize::Seed,
            m if m < 30 => CitySize::Small,
            m if m < 50 => CitySize::Medium,
            m if m < 100 => CitySize::Large,
            _ => CitySize::Established,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CitySize::Seed => "5-15",
            CitySize::Small => "15-30",
            CitySize::Medium => "30-50",
            CitySize::Large => "50-100",
            CitySize::Established => "100+",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub name: &'static str,
    pub description: &'static str,
    pub difficulty: Difficulty,
    pub reward_points: i32,
    pub time_commitment: &'static str,
    pub prerequisites: &'static [&'static str],
    pub city_size: CitySize,
}

impl Activity {
    /// Stable identifier: lowercase name with whitespace runs replaced by `-`
    pub fn slug(&self) -> String {
        self.name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase()
    }
}

const SEED: &[Activity] = &[
    Activity {
        name: "Coffee Meetup",
        description: "Informal gathering at a local cafe to get to know each other",
        difficulty: Difficulty::Easy,
        reward_points: 10,
        time_commitment: "2 hours",
        prerequisites: &[],
        city_size: CitySize::Seed,
    },
    Activity {
        name: "Skill-Share Session",
        description: "Members teach each other skills (cooking, repair, coding, etc.)",
        difficulty: Difficulty::Easy,
        reward_points: 15,
        time_commitment: "3 hours",
        prerequisites: &[],
        city_size: CitySize::Seed,
    },
    Activity {
        name: "Create Communication Channel",
        description: "Set up WhatsApp/Signal group for coordination",
        difficulty: Difficulty::Easy,
        reward_points: 10,
        time_commitment: "30 minutes",
        prerequisites: &[],
        city_size: CitySize::Seed,
    },
];

const SMALL: &[Activity] = &[
    Activity {
        name: "Community Dinner Series",
        description: "Monthly potluck dinners to build relationships",
        difficulty: Difficulty::Medium,
        reward_points: 25,
        time_commitment: "Ongoing (monthly)",
        prerequisites: &["venue_access"],
        city_size: CitySize::Small,
    },
    Activity {
        name: "Start a Community Garden",
        description: "Collective gardening project for food and connection",
        difficulty: Difficulty::Medium,
        reward_points: 50,
        time_commitment: "Ongoing (seasonal)",
        prerequisites: &["land_access"],
        city_size: CitySize::Small,
    },
    Activity {
        name: "Tool Library Launch",
        description: "Share tools and equipment within the community",
        difficulty: Difficulty::Medium,
        reward_points: 40,
        time_commitment: "Ongoing",
        prerequisites: &["storage_space"],
        city_size: CitySize::Small,
    },
];

const MEDIUM: &[Activity] = &[
    Activity {
        name: "Timebanking System",
        description: "Exchange skills and services using time as currency",
        difficulty: Difficulty::Medium,
        reward_points: 75,
        time_commitment: "Ongoing",
        prerequisites: &["coordinator"],
        city_size: CitySize::Medium,
    },
    Activity {
        name: "Housing Cooperative Formation",
        description: "Start a co-housing or cooperative housing project",
        difficulty: Difficulty::Hard,
        reward_points: 100,
        time_commitment: "6-12 months",
        prerequisites: &["legal_advisor", "capital"],
        city_size: CitySize::Medium,
    },
    Activity {
        name: "Community Supported Agriculture (CSA)",
        description: "Partner with local farmers for shared food production",
        difficulty: Difficulty::Medium,
        reward_points: 60,
        time_commitment: "Seasonal",
        prerequisites: &["farmer_partner"],
        city_size: CitySize::Medium,
    },
];

const LARGE: &[Activity] = &[
    Activity {
        name: "Cooperative Business",
        description: "Launch a worker-owned business or service",
        difficulty: Difficulty::Hard,
        reward_points: 150,
        time_commitment: "12+ months",
        prerequisites: &["business_plan", "capital", "legal_structure"],
        city_size: CitySize::Large,
    },
    Activity {
        name: "Community Land Trust",
        description: "Acquire and steward land for affordable housing",
        difficulty: Difficulty::Hard,
        reward_points: 200,
        time_commitment: "24+ months",
        prerequisites: &["legal_entity", "capital", "board"],
        city_size: CitySize::Large,
    },
    Activity {
        name: "Mutual Aid Network",
        description: "Formalized system for community mutual support",
        difficulty: Difficulty::Medium,
        reward_points: 75,
        time_commitment: "Ongoing",
        prerequisites: &["coordinators"],
        city_size: CitySize::Large,
    },
];

const ESTABLISHED: &[Activity] = &[
    Activity {
        name: "Cooperative Credit Union",
        description: "Member-owned financial institution",
        difficulty: Difficulty::Hard,
        reward_points: 300,
        time_commitment: "24+ months",
        prerequisites: &["legal_entity", "capital", "board", "regulatory_approval"],
        city_size: CitySize::Established,
    },
    Activity {
        name: "Neighborhood Council",
        description: "Democratic governance for neighborhood decisions",
        difficulty: Difficulty::Medium,
        reward_points: 100,
        time_commitment: "Ongoing",
        prerequisites: &["formal_structure"],
        city_size: CitySize::Established,
    },
    Activity {
        name: "Community Center",
        description: "Physical space for meetings, events, and programs",
        difficulty: Difficulty::Hard,
        reward_points: 250,
        time_commitment: "18+ months",
        prerequisites: &["legal_entity", "capital", "property"],
        city_size: CitySize::Established,
    },
];

pub fn activities_for(size: CitySize) -> &'static [Activity] {
    match size {
        CitySize::Seed => SEED,
        CitySize::Small => SMALL,
        CitySize::Medium => MEDIUM,
        CitySize::Large => LARGE,
        CitySize::Established => ESTABLISHED,
    }
}

/// Activities suited to a city with `members` group members
pub fn activities_for_city(members: i64) -> &'static [Activity] {
    activities_for(CitySize::for_member_count(members))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_are_half_open() {
        assert_eq!(CitySize::for_member_count(0), CitySize::Seed);
        assert_eq!(CitySize::for_member_count(14), CitySize::Seed);
        assert_eq!(CitySize::for_member_count(15), CitySize::Small);
        assert_eq!(CitySize::for_member_count(49), CitySize::Medium);
        assert_eq!(CitySize::for_member_count(99), CitySize::Large);
        assert_eq!(CitySize::for_member_count(100), CitySize::Established);
    }

    #[test]
    fn every_bracket_has_three_activities() {
        for size in [
            CitySize::Seed,
            CitySize::Small,
            CitySize::Medium,
            CitySize::Large,
            CitySize::Established,
        ] {
            let list = activities_for(size);
            assert_eq!(list.len(), 3, "{}", size.label());
            assert!(list.iter().all(|a| a.city_size == size));
        }
    }

    #[test]
    fn slug_collapses_whitespace() {
        assert_eq!(SMALL[0].slug(), "community-dinner-series");
        assert_eq!(MEDIUM[2].slug(), "community-supported-agriculture-(csa)");
    }
}
