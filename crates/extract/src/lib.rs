pub mod normalizer;
pub mod patterns;
pub mod schema;

pub use schema::{Entity, EntityFamily, EntityType, EntityValue};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

/// Shortest surface string accepted as an entity.
const MIN_NAME_CHARS: usize = 3;

/// Per-run entity registry keyed by `type:normalized name`.
#[derive(Debug, Default)]
pub struct EntityExtractor {
    entities: IndexMap<String, Entity>,
    counter: usize,
}

impl EntityExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract every entity mentioned in `content`.
    ///
    /// Each distinct key is returned once, in pattern-table order. A passage
    /// counts as one mention per entity no matter how often it is extracted.
    pub fn extract_all(&mut self, content: &str, source_section: &str) -> Vec<Entity> {
        let passage = passage_fingerprint(content);
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for (entity_type, name) in patterns::observe(content) {
            if name.chars().count() < MIN_NAME_CHARS {
                continue;
            }
            let key = normalizer::entity_key(entity_type, &name);
            if !seen.insert(key.clone()) {
                continue;
            }
            let entity = self.add_entity(key, &name, entity_type, source_section, &passage);
            found.push(entity.clone());
        }

        found
    }

    fn add_entity(
        &mut self,
        key: String,
        name: &str,
        entity_type: EntityType,
        source_section: &str,
        passage: &str,
    ) -> &Entity {
        if !self.entities.contains_key(&key) {
            self.counter += 1;
            let entity = Entity {
                id: format!("ent_{:04}", self.counter),
                name: name.to_string(),
                entity_type,
                value: normalizer::coerce_value(entity_type, name),
                source_sections: Vec::new(),
                mentions: 0,
                passages: HashSet::new(),
            };
            self.entities.insert(key.clone(), entity);
        }

        let entity = &mut self.entities[&key];
        if entity.passages.insert(passage.to_string()) {
            entity.mentions += 1;
        }
        if !source_section.is_empty()
            && !entity.source_sections.iter().any(|s| s == source_section)
        {
            entity.source_sections.push(source_section.to_string());
        }
        entity
    }

    /// Fold another registry into this one.
    ///
    /// Keys already present accumulate passages and sections; new keys get fresh
    /// ids from this registry's counter, in `other`'s insertion order.
    pub fn merge(&mut self, other: EntityExtractor) {
        for (key, incoming) in other.entities {
            match self.entities.get_mut(&key) {
                Some(existing) => {
                    existing.passages.extend(incoming.passages);
                    existing.mentions = existing.passages.len();
                    for section in incoming.source_sections {
                        if !existing.source_sections.contains(&section) {
                            existing.source_sections.push(section);
                        }
                    }
                }
                None => {
                    self.counter += 1;
                    let entity = Entity {
                        id: format!("ent_{:04}", self.counter),
                        ..incoming
                    };
                    self.entities.insert(key, entity);
                }
            }
        }
    }

    pub fn get_all_entities(&self) -> &IndexMap<String, Entity> {
        &self.entities
    }

    pub fn get(&self, entity_type: EntityType, name: &str) -> Option<&Entity> {
        self.entities.get(&normalizer::entity_key(entity_type, name))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Write the registry as a `"type:name" -> Entity` JSON map.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entities)
            .context("Failed to serialize entities")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write entities: {}", path.display()))?;
        tracing::debug!(path = %path.display(), entities = self.entities.len(), "Saved entities");
        Ok(())
    }
}

fn passage_fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}
