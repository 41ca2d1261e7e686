//! GSP group catalog.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Zone {
    pub id: &'static str,
    pub name: &'static str,
}

pub static GSP_ZONES: [Zone; 14] = [
    Zone { id: "_A", name: "Eastern" },
    Zone { id: "_B", name: "East Midlands" },
    Zone { id: "_C", name: "London" },
    Zone { id: "_D", name: "Merseyside and North Wales" },
    Zone { id: "_E", name: "West Midlands" },
    Zone { id: "_F", name: "North Eastern" },
    Zone { id: "_G", name: "North Western" },
    Zone { id: "_H", name: "Southern" },
    Zone { id: "_J", name: "South Eastern" },
    Zone { id: "_K", name: "South Wales" },
    Zone { id: "_L", name: "South Western" },
    Zone { id: "_M", name: "Yorkshire" },
    Zone { id: "_N", name: "South Scotland" },
    Zone { id: "_P", name: "North Scotland" },
];

pub fn find(id: &str) -> Option<&'static Zone> {
    GSP_ZONES.iter().find(|z| z.id == id)
}

/// Display name, falling back to the raw id for unknown zones.
pub fn name_of(id: &str) -> &str {
    find(id).map(|z| z.name).unwrap_or(id)
}
