use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The system categories every user starts with. Rows for these are seeded by
/// the initial migration with a NULL owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefaultCategory {
    Faith,
    Life,
    Work,
    Health,
}

impl DefaultCategory {
    pub const ALL: [DefaultCategory; 4] = [
        DefaultCategory::Faith,
        DefaultCategory::Life,
        DefaultCategory::Work,
        DefaultCategory::Health,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DefaultCategory::Faith => "Faith",
            DefaultCategory::Life => "Life",
            DefaultCategory::Work => "Work",
            DefaultCategory::Health => "Health",
        }
    }

    /// Fixed row id, identical in every database (seeded by the initial migration).
    pub fn id(&self) -> Uuid {
        let n = match self {
            DefaultCategory::Faith => 1,
            DefaultCategory::Life => 2,
            DefaultCategory::Work => 3,
            DefaultCategory::Health => 4,
        };
        Uuid::from_u128(0x6f1a0c1e_0000_4000_8000_000000000000 | n)
    }

    pub fn color(&self) -> &'static str {
        match self {
            DefaultCategory::Faith => "#8b5cf6",
            DefaultCategory::Life => "#10b981",
            DefaultCategory::Work => "#3b82f6",
            DefaultCategory::Health => "#ef4444",
        }
    }

    /// Looks up a default category by name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

/// Colors handed out to categories created without an explicit color.
pub const CATEGORY_PALETTE: [&str; 6] = [
    "#f59e0b", "#14b8a6", "#ec4899", "#6366f1", "#84cc16", "#0ea5e9",
];
