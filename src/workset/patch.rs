use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use log::{debug, info};

use crate::audio::Owner;
use crate::error::Result;
use crate::store::{AssetIds, AssetStore};
use crate::toc::text::StringEntry;
use crate::toc::{write_store, Archive};
use crate::workset::WorkingSet;

/// File name of a combined patch.
pub const PATCH_NAME: &str = "9ba626afa44a3aa3.patch_0";
pub const PATCH_SUFFIX: &str = ".patch_0";

/// An id from an imported patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRef {
    Audio(u32),
    Entry(u32),
    Stream(u64),
    TextBank(u64),
    Video(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub archive: String,
    pub audio: Vec<u32>,
    pub streams: Vec<u64>,
    pub entries: Vec<u32>,
    pub strings: Vec<u32>,
    pub videos: Vec<u64>,
    /// Ids the working set did not have.
    pub unresolved: Vec<AssetRef>,
    /// Name of the constituent created from unresolved data.
    pub residue: Option<String>,
}

impl ImportReport {
    pub fn applied(&self) -> usize {
        self.audio.len()
            + self.streams.len()
            + self.entries.len()
            + self.strings.len()
            + self.videos.len()
    }
}

/// `name.patch_0` for a base archive name; patch names are kept as they are.
pub fn patch_file_name(archive: &str) -> String {
    match archive.find(".patch_") {
        Some(at) => format!("{}{PATCH_SUFFIX}", &archive[..at]),
        None => format!("{archive}{PATCH_SUFFIX}"),
    }
}

impl WorkingSet {
    pub fn import_patch<P: AsRef<Path>>(&mut self, path: P) -> Result<ImportReport> {
        let patch = Archive::open(path)?;
        self.import_archive(patch)
    }

    /// Applies a decoded patch. Each incoming value is compared with the
    /// baseline (the pre-edit snapshot when edited, the live value otherwise)
    /// and applied only when it differs, so importing twice changes nothing.
    /// Data for ids this working set lacks is merged as a new constituent.
    pub fn import_archive(&mut self, patch: Archive) -> Result<ImportReport> {
        let Archive {
            name, store: patch, ..
        } = patch;
        let mut report = ImportReport {
            archive: name.clone(),
            ..ImportReport::default()
        };
        let mut residue = AssetIds::default();
        let mut handled_audio = IndexSet::new();

        for (file_id, stream) in &patch.streams {
            let Some(existing) = self.store.streams.get(file_id) else {
                report.unresolved.push(AssetRef::Stream(*file_id));
                residue.streams.insert(*file_id);
                if let Some(source) = stream.source {
                    residue.audio.insert(source);
                }
                continue;
            };
            let incoming = patch.stream_payload(stream);
            match existing.source.filter(|s| self.store.audio.contains_key(s)) {
                Some(source) => {
                    handled_audio.insert(source);
                    if self.apply_audio(source, incoming)? {
                        report.audio.push(source);
                    }
                }
                None => {
                    if existing.baseline() != incoming
                        && self.store.set_stream_data(*file_id, incoming.to_vec())?
                    {
                        report.streams.push(*file_id);
                    }
                }
            }
        }

        for (id, source) in &patch.audio {
            if handled_audio.contains(id) {
                continue;
            }
            if self.store.audio.contains_key(id) {
                if self.apply_audio(*id, &source.data)? {
                    report.audio.push(*id);
                }
                continue;
            }
            report.unresolved.push(AssetRef::Audio(*id));
            residue.audio.insert(*id);
            for owner in &source.parents {
                if let Owner::Bank(bank) = owner {
                    residue.banks.insert(*bank);
                }
            }
        }

        for (id, entry) in &patch.hierarchy {
            let Some(existing) = self.store.hierarchy.get(id) else {
                report.unresolved.push(AssetRef::Entry(*id));
                residue.banks.extend(entry.soundbanks.iter().copied());
                continue;
            };
            let baseline = match &existing.previous {
                Some(previous) => previous.clone(),
                None => existing.payload()?,
            };
            if entry.payload()? == baseline {
                continue;
            }
            if self.store.replace_entry_body(*id, entry.body.clone())? {
                report.entries.push(*id);
            }
        }

        for (file_id, bank) in &patch.text_banks {
            let Some(existing) = self.store.text_banks.get_mut(file_id) else {
                report.unresolved.push(AssetRef::TextBank(*file_id));
                residue.text_banks.insert(*file_id);
                continue;
            };
            let mut added = false;
            for (id, incoming) in &bank.strings {
                match existing.strings.get_mut(id) {
                    Some(current) => {
                        let baseline = current.previous.as_ref().unwrap_or(&current.text);
                        if *baseline != incoming.text && current.set(&incoming.text) {
                            report.strings.push(*id);
                        }
                    }
                    None => {
                        existing
                            .strings
                            .insert(*id, StringEntry::new(incoming.text.clone()));
                        report.strings.push(*id);
                        added = true;
                    }
                }
            }
            if added {
                existing.dirty += 1;
            }
        }

        for (file_id, video) in &patch.videos {
            let Some(existing) = self.store.videos.get(file_id) else {
                report.unresolved.push(AssetRef::Video(*file_id));
                residue.videos.insert(*file_id);
                continue;
            };
            if existing.data != video.payload()
                && self.store.set_video_data(*file_id, video.payload().to_vec())?
            {
                report.videos.push(*file_id);
            }
        }

        if residue.has_records() {
            let name = self.residue_name(&name);
            let store = residue_store(&patch, residue);
            debug!(
                "Residue of {} keeps {} records",
                report.archive,
                store.record_count()
            );
            self.add_archive(Archive::new(name.clone(), store))?;
            report.residue = Some(name);
        }

        info!(
            "Imported {}: {} changes applied, {} ids unresolved",
            report.archive,
            report.applied(),
            report.unresolved.len()
        );
        Ok(report)
    }

    fn apply_audio(&mut self, id: u32, incoming: &[u8]) -> Result<bool> {
        let baseline_matches = self
            .store
            .audio
            .get(&id)
            .is_some_and(|a| a.baseline() == incoming);
        if baseline_matches {
            return Ok(false);
        }
        self.store.replace_audio(id, incoming.to_vec())
    }

    fn residue_name(&self, base: &str) -> String {
        if !self.has_archive(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}#{n}"))
            .find(|candidate| !self.has_archive(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Writes every modification as `9ba626afa44a3aa3.patch_0`.
    pub fn write_patch<P: AsRef<Path>>(&self, folder: P) -> Result<PathBuf> {
        let ids = self.store.patch_ids(None);
        let subset = self.store.subset(&ids);
        write_store(&subset, PATCH_NAME, folder.as_ref())
    }

    /// One `<archive>.patch_0` per archive that holds modified records.
    pub fn write_separate_patches<P: AsRef<Path>>(&self, folder: P) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (name, membership) in self.memberships() {
            let ids = self.store.patch_ids(Some(&membership.ids));
            if !ids.has_records() {
                continue;
            }
            let mut subset = self.store.subset(&ids);
            subset.header_unknown = membership.header_unknown;
            subset.header_reserved = membership.header_reserved;
            written.push(write_store(&subset, &patch_file_name(name), folder.as_ref())?);
        }
        Ok(written)
    }

    /// Writes the complete current state of one constituent archive.
    pub fn write_full_archive<P: AsRef<Path>>(&self, name: &str, folder: P) -> Result<PathBuf> {
        let membership = self.require_archive(name)?;
        let mut ids = membership.ids.clone();
        for bank_id in &membership.ids.banks {
            let Some(bank) = self.store.banks.get(bank_id) else {
                continue;
            };
            for entry_id in &bank.hierarchy {
                let Some(entry) = self.store.hierarchy.get(entry_id) else {
                    continue;
                };
                ids.hierarchy.insert(*entry_id);
                for source in entry.body.sources() {
                    if self.store.audio.contains_key(&source.source_id) {
                        ids.audio.insert(source.source_id);
                    }
                }
            }
        }
        let mut subset = self.store.subset(&ids);
        subset.header_unknown = membership.header_unknown;
        subset.header_reserved = membership.header_reserved;
        write_store(&subset, name, folder.as_ref())
    }
}

/// The part of a patch the working set could not absorb: banks holding
/// unresolved data with their dependency, entries and audio, plus unresolved
/// streams, text banks and videos. Everything in it is marked modified so it
/// is carried into the next patch.
fn residue_store(patch: &AssetStore, mut ids: AssetIds) -> AssetStore {
    for bank_id in ids.banks.clone() {
        let Some(bank) = patch.banks.get(&bank_id) else {
            continue;
        };
        if patch.dependencies.contains_key(&bank_id) {
            ids.dependencies.insert(bank_id);
        }
        for entry_id in &bank.hierarchy {
            let Some(entry) = patch.hierarchy.get(entry_id) else {
                continue;
            };
            ids.hierarchy.insert(*entry_id);
            for source in entry.body.sources() {
                if patch.audio.contains_key(&source.source_id) {
                    ids.audio.insert(source.source_id);
                }
            }
        }
    }

    let mut store = patch.subset(&ids);
    for bank in store.banks.values_mut() {
        bank.dirty += 1;
    }
    for stream in store.streams.values_mut() {
        stream.dirty += 1;
    }
    for text in store.text_banks.values_mut() {
        text.dirty += 1;
    }
    for video in store.videos.values_mut() {
        video.replacement = Some(video.data.clone());
    }
    store
}
