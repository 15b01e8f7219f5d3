use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Entity categories recognised by the pattern table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    // Named
    Prodi,
    Fakultas,
    Beasiswa,
    // Numerical
    Biaya,
    Tanggal,
    Durasi,
    Kuota,
    // Procedural
    Langkah,
    Syarat,
    Dokumen,
}

impl EntityType {
    pub const ALL: [EntityType; 10] = [
        EntityType::Prodi,
        EntityType::Fakultas,
        EntityType::Beasiswa,
        EntityType::Biaya,
        EntityType::Tanggal,
        EntityType::Durasi,
        EntityType::Kuota,
        EntityType::Langkah,
        EntityType::Syarat,
        EntityType::Dokumen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Prodi => "prodi",
            EntityType::Fakultas => "fakultas",
            EntityType::Beasiswa => "beasiswa",
            EntityType::Biaya => "biaya",
            EntityType::Tanggal => "tanggal",
            EntityType::Durasi => "durasi",
            EntityType::Kuota => "kuota",
            EntityType::Langkah => "langkah",
            EntityType::Syarat => "syarat",
            EntityType::Dokumen => "dokumen",
        }
    }

    pub fn family(&self) -> EntityFamily {
        match self {
            EntityType::Prodi | EntityType::Fakultas | EntityType::Beasiswa => EntityFamily::Named,
            EntityType::Biaya | EntityType::Tanggal | EntityType::Durasi | EntityType::Kuota => {
                EntityFamily::Numerical
            }
            EntityType::Langkah | EntityType::Syarat | EntityType::Dokumen => {
                EntityFamily::Procedural
            }
        }
    }

    /// Types whose value is coerced to the first embedded integer.
    pub fn is_counted(&self) -> bool {
        matches!(self, EntityType::Biaya | EntityType::Durasi | EntityType::Kuota)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityFamily {
    Named,
    Numerical,
    Procedural,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    Integer(i64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub value: EntityValue,
    pub source_sections: Vec<String>,
    pub mentions: usize,
    /// Fingerprints of the passages already counted in `mentions`.
    #[serde(skip)]
    pub(crate) passages: HashSet<String>,
}

impl Entity {
    /// Registry key: `type:normalized name`.
    pub fn key(&self) -> String {
        crate::normalizer::entity_key(self.entity_type, &self.name)
    }
}
