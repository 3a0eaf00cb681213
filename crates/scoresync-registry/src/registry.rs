//! The in-memory registry: a collision-checked store of matched entries plus
//! their relationship groups and artifact records (spec.md §4.D).

use crate::error::RegistryError;
use scoresync_model::{
    ArtifactRecord, OrnamentGroup, PedalExtension, RegistryEntry, TiedGroup, UniversalId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The full persisted registry document (spec.md §3.2, §6.2: `registry.json`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Registry {
    entries: BTreeMap<String, RegistryEntry>,
    tied_groups: Vec<TiedGroup>,
    ornament_groups: Vec<OrnamentGroup>,
    pedal_extensions: Vec<PedalExtension>,
    artifacts: BTreeMap<String, Vec<ArtifactRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a single matched entry. Rejects a 4-hex-char filename-prefix
    /// collision against an existing entry so the caller can re-salt and
    /// re-derive the ID (spec.md §3.2, §9 Open Question: re-salt on collision).
    pub fn register(&mut self, entry: RegistryEntry) -> Result<(), RegistryError> {
        if let Some(existing) = self.find_prefix_collision(&entry.universal_id) {
            return Err(RegistryError::PrefixCollision {
                new: entry.universal_id,
                existing,
            });
        }
        let key = entry.universal_id.to_hex();
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateId(entry.universal_id));
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Registers every flattened entry belonging to a tied group, plus the
    /// group itself.
    pub fn register_tied_group(
        &mut self,
        group: TiedGroup,
        flattened_entries: Vec<RegistryEntry>,
    ) -> Result<(), RegistryError> {
        for entry in flattened_entries {
            self.register(entry)?;
        }
        self.tied_groups.push(group);
        Ok(())
    }

    /// Registers every flattened entry belonging to an ornament group, plus
    /// the group itself.
    pub fn register_ornament_group(
        &mut self,
        group: OrnamentGroup,
        flattened_entries: Vec<RegistryEntry>,
    ) -> Result<(), RegistryError> {
        for entry in flattened_entries {
            self.register(entry)?;
        }
        self.ornament_groups.push(group);
        Ok(())
    }

    pub fn annotate_pedal(&mut self, extensions: Vec<PedalExtension>) {
        self.pedal_extensions.extend(extensions);
    }

    /// Records a tied group's metadata without re-registering its already-flattened
    /// entries (use when the caller registered `entries()` from a
    /// `RelationshipOutcome` directly).
    pub fn record_tied_group(&mut self, group: TiedGroup) {
        self.tied_groups.push(group);
    }

    /// Records an ornament group's metadata without re-registering its already-flattened entries.
    pub fn record_ornament_group(&mut self, group: OrnamentGroup) {
        self.ornament_groups.push(group);
    }

    /// Records that `id` gained an artifact (spec.md §4.D, §4.F).
    pub fn update_artifact(&mut self, id: UniversalId, artifact: ArtifactRecord) {
        self.artifacts.entry(id.to_hex()).or_default().push(artifact);
    }

    pub fn artifacts_for(&self, id: &UniversalId) -> &[ArtifactRecord] {
        self.artifacts
            .get(&id.to_hex())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, id: &UniversalId) -> Option<&RegistryEntry> {
        self.entries.get(&id.to_hex())
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn tied_groups(&self) -> &[TiedGroup] {
        &self.tied_groups
    }

    pub fn ornament_groups(&self) -> &[OrnamentGroup] {
        &self.ornament_groups
    }

    pub fn pedal_extensions(&self) -> &[PedalExtension] {
        &self.pedal_extensions
    }

    /// Finds an entry whose performance event matches `track`/`pitch` and
    /// whose sounding interval contains `time` (spec.md §4.D lookup contract).
    pub fn lookup_by_midi(&self, track: usize, pitch: u8, time: f64) -> Option<&RegistryEntry> {
        self.entries.values().find(|entry| {
            entry.performance_event.as_ref().is_some_and(|event| {
                event.track == track
                    && event.midi_pitch == pitch
                    && event.start_time <= time
                    && time <= event.end_time
            })
        })
    }

    /// Finds an entry whose score note sits at `part_id`/`measure`/`beat`.
    pub fn lookup_by_score(
        &self,
        part_id: &str,
        measure: u32,
        beat: num_rational::Ratio<i64>,
    ) -> Option<&RegistryEntry> {
        self.entries.values().find(|entry| {
            entry.score_note.part_id == part_id
                && entry.score_note.measure == measure
                && entry.score_note.beat == beat
        })
    }

    /// All entries (and expansion sub-IDs) whose universal ID starts with the
    /// given 4-hex-char filename prefix (spec.md §3.2, §6.3).
    pub fn lookup_by_filename_prefix(&self, prefix4: &str) -> Vec<&RegistryEntry> {
        self.entries
            .values()
            .filter(|entry| entry.universal_id.prefix4() == prefix4)
            .collect()
    }

    fn find_prefix_collision(&self, id: &UniversalId) -> Option<UniversalId> {
        let prefix = id.prefix4();
        self.entries
            .values()
            .map(|e| e.universal_id)
            .find(|existing| existing != id && existing.prefix4() == prefix)
    }
}
