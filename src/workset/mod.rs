//! A working set ("mod"): several archives merged into one arena.
//!
//! Every id keeps a refcount equal to the number of loaded archives that
//! contributed it. Entities shared between archives exist once; removing an
//! archive only deletes what no other archive still holds.

pub mod patch;
pub mod registry;

use std::hash::Hash;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::audio::Owner;
use crate::context::SessionContext;
use crate::error::{Error, Result};
use crate::hirc::source::TrackInfo;
use crate::hirc::HircBody;
use crate::store::{AssetIds, AssetStore, ModifiedSet};
use crate::toc::Archive;

/// What one archive contributed to the working set.
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub path: Option<PathBuf>,
    pub ids: AssetIds,
    pub header_unknown: u32,
    pub header_reserved: [u8; 56],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Refcounts {
    pub streams: IndexMap<u64, u32>,
    pub banks: IndexMap<u64, u32>,
    pub dependencies: IndexMap<u64, u32>,
    pub text_banks: IndexMap<u64, u32>,
    pub videos: IndexMap<u64, u32>,
    pub audio: IndexMap<u32, u32>,
    pub hierarchy: IndexMap<u32, u32>,
}

/// Returns `true` when `id` was not held before.
fn acquire<K: Hash + Eq>(counts: &mut IndexMap<K, u32>, id: K) -> bool {
    let count = counts.entry(id).or_insert(0);
    *count += 1;
    *count == 1
}

/// Returns `true` when the last reference to `id` was dropped.
fn release<K: Hash + Eq>(counts: &mut IndexMap<K, u32>, id: &K) -> bool {
    match counts.get_mut(id) {
        Some(count) if *count > 1 => {
            *count -= 1;
            false
        }
        Some(_) => {
            counts.shift_remove(id);
            true
        }
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct WorkingSet {
    pub name: String,
    store: AssetStore,
    refcounts: Refcounts,
    archives: IndexMap<String, Membership>,
}

impl WorkingSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: AssetStore::default(),
            refcounts: Refcounts::default(),
            archives: IndexMap::new(),
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AssetStore {
        &mut self.store
    }

    pub fn refcounts(&self) -> &Refcounts {
        &self.refcounts
    }

    pub fn archive_names(&self) -> impl Iterator<Item = &str> {
        self.archives.keys().map(String::as_str)
    }

    pub fn membership(&self, name: &str) -> Option<&Membership> {
        self.archives.get(name)
    }

    pub fn has_archive(&self, name: &str) -> bool {
        self.archives.contains_key(name)
    }

    pub fn load_archive<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let archive = Archive::open(path)?;
        self.add_archive(archive)
    }

    /// Decodes every path in parallel, then merges the archives in input
    /// order. A decode failure aborts before anything is merged.
    pub fn load_archives<P: AsRef<Path> + Sync>(&mut self, paths: &[P]) -> Result<Vec<bool>> {
        let archives: Vec<Archive> = paths
            .par_iter()
            .map(|path| Archive::open(path))
            .collect::<Result<Vec<_>>>()?;
        let mut added = Vec::with_capacity(archives.len());
        for archive in archives {
            added.push(self.add_archive(archive)?);
        }
        Ok(added)
    }

    /// Merges an archive. Refuses (returns `false`) a name already loaded.
    pub fn add_archive(&mut self, archive: Archive) -> Result<bool> {
        if self.archives.contains_key(&archive.name) {
            warn!("Archive {} is already loaded", archive.name);
            return Ok(false);
        }
        let Archive {
            name,
            path,
            store: incoming,
        } = archive;
        let ids = incoming.ids();
        let AssetStore {
            header_unknown,
            header_reserved,
            streams,
            banks,
            dependencies,
            text_banks,
            videos,
            audio,
            hierarchy,
        } = incoming;
        if self.archives.is_empty() {
            self.store.header_unknown = header_unknown;
            self.store.header_reserved = header_reserved;
        }

        for (id, stream) in streams {
            if acquire(&mut self.refcounts.streams, id) {
                self.store.streams.insert(id, stream);
            }
        }

        for (id, bank) in banks {
            if acquire(&mut self.refcounts.banks, id) {
                self.store.banks.insert(id, bank);
                continue;
            }
            if let Some(existing) = self.store.banks.get_mut(&id) {
                let before = existing.hierarchy.len();
                for entry in bank.hierarchy {
                    if !existing.hierarchy.contains(&entry) {
                        existing.hierarchy.push(entry);
                    }
                }
                if existing.hierarchy.len() > before {
                    debug!(
                        "Bank {id:#018x} gained {} entries from {name}",
                        existing.hierarchy.len() - before
                    );
                    existing.dirty += 1;
                }
                if existing.dependency_path.is_none() {
                    existing.dependency_path = bank.dependency_path;
                }
            }
        }

        for (id, dependency) in dependencies {
            if acquire(&mut self.refcounts.dependencies, id) {
                self.store.dependencies.insert(id, dependency);
            }
        }

        for (id, text) in text_banks {
            if acquire(&mut self.refcounts.text_banks, id) {
                self.store.text_banks.insert(id, text);
            } else if let Some(existing) = self.store.text_banks.get_mut(&id) {
                existing.merge_missing(&text);
            }
        }

        for (id, video) in videos {
            if acquire(&mut self.refcounts.videos, id) {
                self.store.videos.insert(id, video);
            }
        }

        for (id, entry) in hierarchy {
            if acquire(&mut self.refcounts.hierarchy, id) {
                self.store.hierarchy.insert(id, entry);
                continue;
            }
            for bank in &entry.soundbanks {
                self.store.attach_entry_bank(id, *bank);
            }
            if let Some(existing) = self.store.hierarchy.get_mut(&id) {
                existing.merge_children(&entry)?;
            }
        }

        for (id, source) in audio {
            if acquire(&mut self.refcounts.audio, id) {
                self.store.audio.insert(id, source);
                continue;
            }
            for owner in source.parents {
                self.store.attach_owner(id, owner);
            }
        }

        self.archives.insert(
            name.clone(),
            Membership {
                path,
                ids,
                header_unknown,
                header_reserved,
            },
        );

        let created = self.store.resolve_audio();
        self.attribute_audio(&created);
        info!(
            "Added {name} to {} ({} archives, {} entries, {} audio sources)",
            self.name,
            self.archives.len(),
            self.store.hierarchy.len(),
            self.store.audio.len()
        );
        Ok(true)
    }

    /// Credits audio sources created by cross-archive resolution to every
    /// archive holding one of their owning entries.
    fn attribute_audio(&mut self, created: &[u32]) {
        for id in created {
            let Some(source) = self.store.audio.get(id) else {
                continue;
            };
            let entries: Vec<u32> = source.owning_entries().collect();
            for membership in self.archives.values_mut() {
                let owns = entries.iter().any(|e| membership.ids.hierarchy.contains(e));
                if owns && membership.ids.audio.insert(*id) {
                    acquire(&mut self.refcounts.audio, *id);
                }
            }
        }
    }

    /// Drops an archive, deleting every entity whose refcount reaches zero.
    pub fn remove_archive(&mut self, name: &str) -> bool {
        let Some(membership) = self.archives.shift_remove(name) else {
            return false;
        };
        let ids = membership.ids;

        let mut gone_streams = Vec::new();
        for id in &ids.streams {
            if release(&mut self.refcounts.streams, id) {
                self.store.streams.shift_remove(id);
                gone_streams.push(*id);
            }
        }
        let mut gone_banks = Vec::new();
        for id in &ids.banks {
            if release(&mut self.refcounts.banks, id) {
                self.store.banks.shift_remove(id);
                gone_banks.push(*id);
            }
        }
        for id in &ids.dependencies {
            if release(&mut self.refcounts.dependencies, id) {
                self.store.dependencies.shift_remove(id);
            }
        }
        for id in &ids.text_banks {
            if release(&mut self.refcounts.text_banks, id) {
                self.store.text_banks.shift_remove(id);
            }
        }
        for id in &ids.videos {
            if release(&mut self.refcounts.videos, id) {
                self.store.videos.shift_remove(id);
            }
        }
        let mut gone_entries = Vec::new();
        for id in &ids.hierarchy {
            if release(&mut self.refcounts.hierarchy, id) {
                self.store.remove_entry(*id);
                gone_entries.push(*id);
            }
        }
        let mut gone_audio = Vec::new();
        for id in &ids.audio {
            if release(&mut self.refcounts.audio, id) {
                self.store.remove_audio(*id);
                gone_audio.push(*id);
            }
        }

        self.store
            .detach(&gone_banks, &gone_entries, &gone_streams, &gone_audio);
        info!("Removed {name} from {}", self.name);
        true
    }

    // ---- collaborator API ----

    pub fn audio_data(&self, id: u32) -> Result<&[u8]> {
        self.store.audio_data(id)
    }

    pub fn set_audio_data(&mut self, id: u32, data: Vec<u8>) -> Result<bool> {
        self.store.set_audio_data(id, data)
    }

    pub fn replace_audio(&mut self, id: u32, data: Vec<u8>) -> Result<bool> {
        self.store.replace_audio(id, data)
    }

    pub fn edit_entry<F>(&mut self, id: u32, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut HircBody) -> Result<()>,
    {
        self.store.edit_entry(id, edit)
    }

    pub fn track_info(&self, id: u32) -> Result<&[TrackInfo]> {
        self.store.track_info(id)
    }

    pub fn set_track_info(&mut self, id: u32, index: usize, info: TrackInfo) -> Result<bool> {
        self.store.set_track_info(id, index, info)
    }

    pub fn segment_duration(&self, id: u32) -> Result<f64> {
        self.store.segment_duration(id)
    }

    pub fn set_segment_duration(&mut self, id: u32, duration: f64) -> Result<bool> {
        self.store.set_segment_duration(id, duration)
    }

    pub fn set_entry_marker(&mut self, id: u32, position: f64) -> Result<bool> {
        self.store.set_entry_marker(id, position)
    }

    pub fn set_exit_marker(&mut self, id: u32, position: f64) -> Result<bool> {
        self.store.set_exit_marker(id, position)
    }

    pub fn set_event_actions(&mut self, id: u32, actions: &[u32]) -> Result<bool> {
        self.store.set_event_actions(id, actions)
    }

    pub fn set_property(&mut self, id: u32, prop_id: u8, value: u32) -> Result<bool> {
        self.store.set_property(id, prop_id, value)
    }

    pub fn set_stream_data(&mut self, file_id: u64, data: Vec<u8>) -> Result<bool> {
        self.store.set_stream_data(file_id, data)
    }

    pub fn set_video_data(&mut self, file_id: u64, data: Vec<u8>) -> Result<bool> {
        self.store.set_video_data(file_id, data)
    }

    pub fn strings(&self, ctx: &SessionContext) -> IndexMap<u32, &str> {
        self.store.strings(ctx)
    }

    pub fn set_string(&mut self, ctx: &SessionContext, id: u32, text: &str) -> Result<bool> {
        self.store.set_string(ctx, id, text)
    }

    pub fn modified(&self) -> ModifiedSet {
        self.store.modified()
    }

    pub fn revert_audio(&mut self, id: u32) -> Result<bool> {
        self.store.revert_audio(id)
    }

    pub fn revert_entry(&mut self, id: u32) -> Result<bool> {
        self.store.revert_entry(id)
    }

    pub fn revert_string(&mut self, ctx: &SessionContext, id: u32) -> Result<bool> {
        self.store.revert_string(ctx, id)
    }

    pub fn revert_stream(&mut self, file_id: u64) -> Result<bool> {
        self.store.revert_stream(file_id)
    }

    pub fn revert_video(&mut self, file_id: u64) -> Result<bool> {
        self.store.revert_video(file_id)
    }

    pub fn revert_all(&mut self) -> Result<()> {
        self.store.revert_all()
    }

    /// Archives whose banks or streams own audio source `id`.
    pub fn archives_owning_audio(&self, id: u32) -> Vec<&str> {
        let Some(source) = self.store.audio.get(&id) else {
            return Vec::new();
        };
        self.archives
            .iter()
            .filter(|(_, m)| {
                source.parents.iter().any(|owner| match owner {
                    Owner::Entry(e) => m.ids.hierarchy.contains(e),
                    Owner::Bank(b) => m.ids.banks.contains(b),
                    Owner::Stream(s) => m.ids.streams.contains(s),
                })
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub(crate) fn require_archive(&self, name: &str) -> Result<&Membership> {
        self.archives.get(name).ok_or_else(|| Error::NameNotFound {
            kind: "archive",
            name: name.to_string(),
        })
    }

    pub(crate) fn memberships(&self) -> impl Iterator<Item = (&String, &Membership)> {
        self.archives.iter()
    }
}
