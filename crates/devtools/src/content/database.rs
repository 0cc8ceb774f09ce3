use std::collections::HashMap;
use std::sync::Arc;

use super::types::Definition;

/// Read-only snapshot of every loaded definition.
///
/// Implementations must return the same slice for the duration of one
/// cache refresh pass.
pub trait DefinitionSource {
    fn definitions(&self) -> &[Arc<Definition>];

    fn definition_by_name(&self, def_name: &str) -> Option<Arc<Definition>> {
        self.definitions()
            .iter()
            .find(|def| def.def_name == def_name)
            .cloned()
    }
}

impl DefinitionSource for [Arc<Definition>] {
    fn definitions(&self) -> &[Arc<Definition>] {
        self
    }
}

impl DefinitionSource for Vec<Arc<Definition>> {
    fn definitions(&self) -> &[Arc<Definition>] {
        self
    }
}

#[derive(Debug, Default, Clone)]
pub struct DefDatabase {
    defs: Vec<Arc<Definition>>,
    index_by_name: HashMap<String, usize>,
}

impl DefDatabase {
    pub fn from_definitions(defs: Vec<Definition>) -> Self {
        let mut database = Self::default();
        for def in defs {
            database.insert(def);
        }
        database
    }

    /// Inserts or replaces a definition by `def_name`. Replacements keep
    /// the first load position.
    pub fn insert(&mut self, def: Definition) {
        let def = Arc::new(def);
        match self.index_by_name.get(&def.def_name) {
            Some(&index) => self.defs[index] = def,
            None => {
                self.index_by_name
                    .insert(def.def_name.clone(), self.defs.len());
                self.defs.push(def);
            }
        }
    }

    pub fn remove(&mut self, def_name: &str) -> Option<Arc<Definition>> {
        let index = self.index_by_name.remove(def_name)?;
        let removed = self.defs.remove(index);
        for slot in self.index_by_name.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, def_name: &str) -> Option<&Arc<Definition>> {
        let index = self.index_by_name.get(def_name)?;
        self.defs.get(*index)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl DefinitionSource for DefDatabase {
    fn definitions(&self) -> &[Arc<Definition>] {
        &self.defs
    }

    fn definition_by_name(&self, def_name: &str) -> Option<Arc<Definition>> {
        self.get(def_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::types::{DefKind, TerrainProps};

    fn terrain(def_name: &str, label: &str) -> Definition {
        Definition {
            def_name: def_name.to_string(),
            label: label.to_string(),
            source_pack: None,
            kind: DefKind::Terrain(TerrainProps::default()),
        }
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut db = DefDatabase::from_definitions(vec![
            terrain("Soil", "soil"),
            terrain("Sand", "sand"),
        ]);
        db.insert(terrain("Soil", "rich soil"));

        assert_eq!(db.len(), 2);
        assert_eq!(db.definitions()[0].label, "rich soil");
        assert_eq!(db.definitions()[1].def_name, "Sand");
    }

    #[test]
    fn remove_reindexes_later_definitions() {
        let mut db = DefDatabase::from_definitions(vec![
            terrain("Soil", "soil"),
            terrain("Sand", "sand"),
            terrain("Mud", "mud"),
        ]);

        let removed = db.remove("Soil").expect("removed");
        assert_eq!(removed.def_name, "Soil");
        assert!(db.get("Soil").is_none());
        assert_eq!(db.get("Mud").expect("mud").label, "mud");
        assert_eq!(db.definition_by_name("Sand").expect("sand").label, "sand");
        assert!(db.remove("Soil").is_none());
    }
}
