//! The entity arena shared by archives and working sets.
//!
//! Cross references are ids, never pointers: entries list the banks that own
//! them, audio sources list their owners, and parents are looked up lazily by
//! id. Edits snapshot the serialized form once and raise a counter on every
//! owner; reverting restores the snapshot and lowers the same counters.

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};

use crate::audio::{wem_duration_ms, AudioSource, Owner};
use crate::bank::Bank;
use crate::context::SessionContext;
use crate::error::{Error, Result};
use crate::hash::stream_file_id;
use crate::hirc::music::MusicSegment;
use crate::hirc::source::{StreamKind, TrackInfo};
use crate::hirc::{HircBody, HircEntry};
use crate::toc::payload::{Dependency, StreamRecord, VideoSource};
use crate::toc::text::TextBank;

#[derive(Debug, Clone, PartialEq)]
pub struct AssetStore {
    /// TOC header fields preserved across round trips.
    pub header_unknown: u32,
    pub header_reserved: [u8; 56],
    pub streams: IndexMap<u64, StreamRecord>,
    pub banks: IndexMap<u64, Bank>,
    pub dependencies: IndexMap<u64, Dependency>,
    pub text_banks: IndexMap<u64, TextBank>,
    pub videos: IndexMap<u64, VideoSource>,
    pub audio: IndexMap<u32, AudioSource>,
    pub hierarchy: IndexMap<u32, HircEntry>,
}

impl Default for AssetStore {
    fn default() -> Self {
        Self {
            header_unknown: 0,
            header_reserved: [0u8; 56],
            streams: IndexMap::new(),
            banks: IndexMap::new(),
            dependencies: IndexMap::new(),
            text_banks: IndexMap::new(),
            videos: IndexMap::new(),
            audio: IndexMap::new(),
            hierarchy: IndexMap::new(),
        }
    }
}

/// Ids per collection, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetIds {
    pub streams: IndexSet<u64>,
    pub banks: IndexSet<u64>,
    pub dependencies: IndexSet<u64>,
    pub text_banks: IndexSet<u64>,
    pub videos: IndexSet<u64>,
    pub audio: IndexSet<u32>,
    pub hierarchy: IndexSet<u32>,
}

impl AssetIds {
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
            && self.banks.is_empty()
            && self.dependencies.is_empty()
            && self.text_banks.is_empty()
            && self.videos.is_empty()
            && self.audio.is_empty()
            && self.hierarchy.is_empty()
    }

    /// Whether any TOC record would be written for this selection.
    pub fn has_records(&self) -> bool {
        !(self.streams.is_empty()
            && self.banks.is_empty()
            && self.dependencies.is_empty()
            && self.text_banks.is_empty()
            && self.videos.is_empty())
    }
}

/// Everything currently carrying an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifiedSet {
    pub audio: Vec<u32>,
    pub hierarchy: Vec<u32>,
    pub banks: Vec<u64>,
    pub streams: Vec<u64>,
    pub text_banks: Vec<u64>,
    pub videos: Vec<u64>,
}

impl ModifiedSet {
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
            && self.hierarchy.is_empty()
            && self.banks.is_empty()
            && self.streams.is_empty()
            && self.text_banks.is_empty()
            && self.videos.is_empty()
    }
}

struct SourceRef {
    bank: u64,
    dependency: Option<String>,
    entry: u32,
    source: u32,
    kind: StreamKind,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> AssetIds {
        AssetIds {
            streams: self.streams.keys().copied().collect(),
            banks: self.banks.keys().copied().collect(),
            dependencies: self.dependencies.keys().copied().collect(),
            text_banks: self.text_banks.keys().copied().collect(),
            videos: self.videos.keys().copied().collect(),
            audio: self.audio.keys().copied().collect(),
            hierarchy: self.hierarchy.keys().copied().collect(),
        }
    }

    pub fn record_count(&self) -> usize {
        self.streams.len()
            + self.banks.len()
            + self.dependencies.len()
            + self.text_banks.len()
            + self.videos.len()
    }

    /// Adds an entry decoded from a bank. An id seen before only gains the
    /// new owning banks.
    pub fn insert_entry(&mut self, entry: HircEntry) {
        match self.hierarchy.get_mut(&entry.id) {
            Some(existing) => existing.soundbanks.extend(entry.soundbanks),
            None => {
                self.hierarchy.insert(entry.id, entry);
            }
        }
    }

    /// Copies each dependency path onto the bank stored under the same id.
    pub fn attach_dependencies(&mut self) {
        for (file_id, dependency) in &self.dependencies {
            if let Some(bank) = self.banks.get_mut(file_id) {
                bank.dependency_path = Some(dependency.path());
            }
        }
    }

    /// Payload written to the stream file for `stream`.
    pub fn stream_payload<'a>(&'a self, stream: &'a StreamRecord) -> &'a [u8] {
        stream
            .source
            .and_then(|id| self.audio.get(&id))
            .map_or(&stream.data, |audio| &audio.data)
    }

    // ---- audio resolution ----

    /// Creates an audio source for every media reference that can be located
    /// and links owners. Sources that cannot be located are logged and skipped.
    /// Returns the ids created by this call.
    pub fn resolve_audio(&mut self) -> Vec<u32> {
        let mut refs = Vec::new();
        for bank in self.banks.values() {
            for id in &bank.hierarchy {
                let Some(entry) = self.hierarchy.get(id) else {
                    continue;
                };
                for source in entry.body.sources() {
                    if let Some(kind) = source.media_kind() {
                        refs.push(SourceRef {
                            bank: bank.file_id(),
                            dependency: bank.dependency_path.clone(),
                            entry: *id,
                            source: source.source_id,
                            kind,
                        });
                    }
                }
            }
        }

        let mut created = IndexSet::new();
        for source_ref in refs {
            match self.resolve_source(&source_ref) {
                Ok(true) => {
                    created.insert(source_ref.source);
                }
                Ok(false) => {}
                Err(e) => warn!(
                    "Source {} of entry {:#010x} unresolved: {e}",
                    source_ref.source, source_ref.entry
                ),
            }
        }
        created.into_iter().collect()
    }

    fn resolve_source(&mut self, source_ref: &SourceRef) -> Result<bool> {
        let stream_id = match (&source_ref.dependency, source_ref.kind.in_stream()) {
            (Some(path), true) => Some(stream_file_id(path, source_ref.source)),
            _ => None,
        };

        let mut created = false;
        if !self.audio.contains_key(&source_ref.source) {
            let (resource_id, data) = match source_ref.kind {
                StreamKind::Embedded => {
                    let bank = self
                        .banks
                        .get(&source_ref.bank)
                        .ok_or_else(|| Error::not_found("bank", source_ref.bank))?;
                    let data = bank
                        .media
                        .get(source_ref.source)
                        .ok_or_else(|| Error::not_found("embedded media", source_ref.source))?;
                    (0, data.to_vec())
                }
                StreamKind::Prefetch | StreamKind::Stream => {
                    let stream_id =
                        stream_id.ok_or_else(|| Error::not_found("dependency", source_ref.bank))?;
                    let stream = self
                        .streams
                        .get(&stream_id)
                        .ok_or_else(|| Error::not_found("stream", stream_id))?;
                    (stream_id, stream.data.clone())
                }
            };
            debug!(
                "Resolved source {} ({:?}, {} bytes)",
                source_ref.source,
                source_ref.kind,
                data.len()
            );
            self.audio.insert(
                source_ref.source,
                AudioSource::new(source_ref.source, source_ref.kind, resource_id, data),
            );
            created = true;
        }

        self.attach_owner(source_ref.source, Owner::Entry(source_ref.entry));
        if source_ref.kind.in_bank() {
            self.attach_owner(source_ref.source, Owner::Bank(source_ref.bank));
        }
        if let Some(stream_id) = stream_id {
            if let Some(stream) = self.streams.get_mut(&stream_id) {
                stream.source = Some(source_ref.source);
                self.attach_owner(source_ref.source, Owner::Stream(stream_id));
            }
        }
        Ok(created)
    }

    /// Adds `owner` to an audio source. A source that is already edited
    /// raises the new owner. Returns `true` if the owner was new.
    pub fn attach_owner(&mut self, audio_id: u32, owner: Owner) -> bool {
        let Some(audio) = self.audio.get_mut(&audio_id) else {
            return false;
        };
        if !audio.parents.insert(owner) {
            return false;
        }
        if audio.is_modified() {
            self.bump(owner, true);
        }
        true
    }

    // ---- flag propagation ----

    fn bump(&mut self, owner: Owner, up: bool) {
        let counter = match owner {
            Owner::Entry(id) => self.hierarchy.get_mut(&id).map(|e| &mut e.raised),
            Owner::Bank(id) => self.banks.get_mut(&id).map(|b| &mut b.dirty),
            Owner::Stream(id) => self.streams.get_mut(&id).map(|s| &mut s.dirty),
        };
        if let Some(counter) = counter {
            if up {
                *counter += 1;
            } else {
                *counter = counter.saturating_sub(1);
            }
        }
    }

    /// Raises or lowers the owning banks of `id` and the entry `parent`.
    fn shift_entry_flags(&mut self, id: u32, parent: Option<u32>, up: bool) {
        let Some(entry) = self.hierarchy.get(&id) else {
            return;
        };
        let banks: Vec<u64> = entry.soundbanks.iter().copied().collect();
        for bank in banks {
            self.bump(Owner::Bank(bank), up);
        }
        if let Some(parent) = parent.filter(|p| *p != id && self.hierarchy.contains_key(p)) {
            self.bump(Owner::Entry(parent), up);
        }
    }

    /// Attaches `bank` as an owner of entry `id`. An edited entry raises the
    /// new bank.
    pub fn attach_entry_bank(&mut self, id: u32, bank: u64) -> bool {
        let Some(entry) = self.hierarchy.get_mut(&id) else {
            return false;
        };
        if !entry.soundbanks.insert(bank) {
            return false;
        }
        if entry.is_modified() {
            self.bump(Owner::Bank(bank), true);
        }
        true
    }

    // ---- hierarchy entries ----

    pub fn entry(&self, id: u32) -> Result<&HircEntry> {
        self.hierarchy
            .get(&id)
            .ok_or_else(|| Error::not_found("hierarchy entry", id))
    }

    /// Applies `edit` to the body of entry `id`. The body is restored if the
    /// closure fails. Returns whether the serialized payload changed.
    ///
    /// The first change snapshots the payload and raises the owning banks and
    /// the parent; an edit that lands back on the snapshot lowers them again.
    pub fn edit_entry<F>(&mut self, id: u32, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut HircBody) -> Result<()>,
    {
        let entry = self
            .hierarchy
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("hierarchy entry", id))?;
        let before = entry.payload()?;
        let saved = entry.body.clone();
        let after = match edit(&mut entry.body).and_then(|()| entry.payload()) {
            Ok(after) => after,
            Err(e) => {
                entry.body = saved;
                return Err(e);
            }
        };
        if after == before {
            return Ok(false);
        }
        entry.size = after.len() as u32;

        let transition = match &entry.previous {
            None => {
                entry.previous = Some(before);
                Some((saved.parent_id(), true))
            }
            Some(previous) if *previous == after => {
                entry.previous = None;
                Some((entry.parent_id(), false))
            }
            Some(_) => None,
        };
        if let Some((parent, up)) = transition {
            self.shift_entry_flags(id, parent, up);
        }
        Ok(true)
    }

    /// Replaces the whole body, keeping the edit bookkeeping.
    pub fn replace_entry_body(&mut self, id: u32, body: HircBody) -> Result<bool> {
        self.edit_entry(id, move |current| {
            *current = body;
            Ok(())
        })
    }

    pub fn revert_entry(&mut self, id: u32) -> Result<bool> {
        let entry = self
            .hierarchy
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("hierarchy entry", id))?;
        let Some(previous) = entry.previous.take() else {
            return Ok(false);
        };
        if let Err(e) = entry.restore(&previous) {
            entry.previous = Some(previous);
            return Err(e);
        }
        let parent = entry.parent_id();
        self.shift_entry_flags(id, parent, false);
        Ok(true)
    }

    pub fn track_info(&self, id: u32) -> Result<&[TrackInfo]> {
        match &self.entry(id)?.body {
            HircBody::MusicTrack(track) => Ok(&track.track_info),
            other => Err(wrong_variant(id, "MusicTrack", other)),
        }
    }

    pub fn set_track_info(&mut self, id: u32, index: usize, info: TrackInfo) -> Result<bool> {
        self.edit_entry(id, |body| match body {
            HircBody::MusicTrack(track) => {
                let slot = track.track_info.get_mut(index).ok_or_else(|| {
                    Error::malformed("track info", format!("index {index} out of range"))
                })?;
                *slot = info;
                Ok(())
            }
            other => Err(wrong_variant(id, "MusicTrack", other)),
        })
    }

    fn segment(&self, id: u32) -> Result<&MusicSegment> {
        match &self.entry(id)?.body {
            HircBody::MusicSegment(segment) => Ok(segment),
            other => Err(wrong_variant(id, "MusicSegment", other)),
        }
    }

    fn edit_segment<F>(&mut self, id: u32, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut MusicSegment) -> Result<()>,
    {
        self.edit_entry(id, |body| match body {
            HircBody::MusicSegment(segment) => edit(segment),
            other => Err(wrong_variant(id, "MusicSegment", other)),
        })
    }

    pub fn segment_duration(&self, id: u32) -> Result<f64> {
        Ok(self.segment(id)?.duration)
    }

    pub fn set_segment_duration(&mut self, id: u32, duration: f64) -> Result<bool> {
        self.edit_segment(id, |segment| {
            segment.duration = duration;
            Ok(())
        })
    }

    /// `(entry, exit)` marker positions.
    pub fn segment_markers(&self, id: u32) -> Result<(Option<f64>, Option<f64>)> {
        let segment = self.segment(id)?;
        Ok((
            segment.entry_marker().map(|m| m.position),
            segment.exit_marker().map(|m| m.position),
        ))
    }

    pub fn set_entry_marker(&mut self, id: u32, position: f64) -> Result<bool> {
        self.edit_segment(id, |segment| segment.set_entry_marker(position))
    }

    pub fn set_exit_marker(&mut self, id: u32, position: f64) -> Result<bool> {
        self.edit_segment(id, |segment| segment.set_exit_marker(position))
    }

    pub fn set_event_actions(&mut self, id: u32, actions: &[u32]) -> Result<bool> {
        self.edit_entry(id, |body| match body {
            HircBody::Event(event) => {
                event.set_actions(actions);
                Ok(())
            }
            other => Err(wrong_variant(id, "Event", other)),
        })
    }

    /// Sets a property in the entry's parameter block.
    pub fn set_property(&mut self, id: u32, prop_id: u8, value: u32) -> Result<bool> {
        self.edit_entry(id, |body| {
            let name = body.kind_name();
            let params = body.params_mut().ok_or(Error::WrongVariant {
                id,
                expected: "node with parameters",
                found: name,
            })?;
            params.props.set(prop_id, value);
            Ok(())
        })
    }

    // ---- audio sources ----

    pub fn audio_data(&self, id: u32) -> Result<&[u8]> {
        self.audio
            .get(&id)
            .map(|a| a.data.as_slice())
            .ok_or_else(|| Error::not_found("audio source", id))
    }

    /// Replaces the payload of an audio source. Returns whether it changed.
    pub fn set_audio_data(&mut self, id: u32, data: Vec<u8>) -> Result<bool> {
        let audio = self
            .audio
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("audio source", id))?;
        if audio.data == data {
            return Ok(false);
        }
        let old_len = audio.data.len();
        let new_len = data.len();
        let kind = audio.kind;
        let transition = match &audio.previous {
            None => {
                audio.previous = Some(std::mem::replace(&mut audio.data, data));
                Some(true)
            }
            Some(previous) if *previous == data => {
                audio.data = data;
                audio.previous = None;
                Some(false)
            }
            Some(_) => {
                audio.data = data;
                None
            }
        };
        let owners: Vec<Owner> = audio.parents.iter().copied().collect();
        if let Some(up) = transition {
            for owner in &owners {
                self.bump(*owner, up);
            }
        }
        if kind == StreamKind::Embedded && old_len != new_len {
            self.sync_mem_size(id, &owners, old_len, new_len)?;
        }
        Ok(true)
    }

    /// Sets the payload and pushes the new duration onto every owning
    /// MusicTrack's clip for this source.
    pub fn replace_audio(&mut self, id: u32, data: Vec<u8>) -> Result<bool> {
        if !self.set_audio_data(id, data)? {
            return Ok(false);
        }
        self.push_duration(id)?;
        Ok(true)
    }

    /// Writes the payload's duration into `source_duration` of every track
    /// info record that plays source `id`.
    pub fn push_duration(&mut self, id: u32) -> Result<()> {
        let audio = self
            .audio
            .get(&id)
            .ok_or_else(|| Error::not_found("audio source", id))?;
        let Some(duration) = wem_duration_ms(&audio.data) else {
            debug!("Source {id}: payload has no readable duration header");
            return Ok(());
        };
        let tracks: Vec<u32> = audio
            .owning_entries()
            .filter(|e| {
                matches!(
                    self.hierarchy.get(e).map(|e| &e.body),
                    Some(HircBody::MusicTrack(_))
                )
            })
            .collect();
        for track in tracks {
            self.edit_entry(track, |body| {
                if let HircBody::MusicTrack(track) = body {
                    for info in track.track_info.iter_mut().filter(|t| t.source_id == id) {
                        info.source_duration = duration;
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Source records whose `mem_size` tracked the old payload length follow
    /// the new one.
    fn sync_mem_size(
        &mut self,
        id: u32,
        owners: &[Owner],
        old_len: usize,
        new_len: usize,
    ) -> Result<()> {
        for owner in owners {
            let Owner::Entry(entry) = owner else {
                continue;
            };
            self.edit_entry(*entry, |body| {
                for source in body.sources_mut() {
                    if source.source_id == id && source.mem_size as usize == old_len {
                        source.mem_size = new_len as u32;
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    pub fn revert_audio(&mut self, id: u32) -> Result<bool> {
        let audio = self
            .audio
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("audio source", id))?;
        let Some(previous) = audio.previous.take() else {
            return Ok(false);
        };
        let old_len = audio.data.len();
        let new_len = previous.len();
        let pushed = wem_duration_ms(&audio.data);
        audio.data = previous;
        let kind = audio.kind;
        let owners: Vec<Owner> = audio.parents.iter().copied().collect();
        for owner in &owners {
            self.bump(*owner, false);
        }
        if kind == StreamKind::Embedded && old_len != new_len {
            self.sync_mem_size(id, &owners, old_len, new_len)?;
        }
        if let Some(pushed) = pushed {
            self.restore_durations(id, &owners, pushed)?;
        }
        Ok(true)
    }

    /// Puts back the `source_duration` each owning track held for source `id`
    /// before it was edited. Only clips still holding `pushed`, the duration
    /// of the payload being reverted, are touched.
    fn restore_durations(&mut self, id: u32, owners: &[Owner], pushed: f64) -> Result<()> {
        for owner in owners {
            let Owner::Entry(track_id) = owner else {
                continue;
            };
            let Some(entry) = self.hierarchy.get(track_id) else {
                continue;
            };
            let Some(previous) = &entry.previous else {
                continue;
            };
            let snapshot = HircEntry::decode(entry.type_tag, previous, entry.version)?;
            let HircBody::MusicTrack(original) = snapshot.body else {
                continue;
            };
            let durations: Vec<(usize, f64)> = original
                .track_info
                .iter()
                .enumerate()
                .filter(|(_, info)| info.source_id == id)
                .map(|(index, info)| (index, info.source_duration))
                .collect();
            self.edit_entry(*track_id, |body| {
                if let HircBody::MusicTrack(track) = body {
                    for (index, duration) in &durations {
                        if let Some(info) = track.track_info.get_mut(*index) {
                            if info.source_id == id && info.source_duration == pushed {
                                info.source_duration = *duration;
                            }
                        }
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    // ---- streams and videos ----

    /// Replaces a stream payload that has no linked audio source.
    pub fn set_stream_data(&mut self, file_id: u64, data: Vec<u8>) -> Result<bool> {
        let stream = self
            .streams
            .get_mut(&file_id)
            .ok_or_else(|| Error::not_found("stream", file_id))?;
        if stream.data == data {
            return Ok(false);
        }
        match &stream.previous {
            None => stream.previous = Some(std::mem::replace(&mut stream.data, data)),
            Some(previous) if *previous == data => {
                stream.data = data;
                stream.previous = None;
            }
            Some(_) => stream.data = data,
        }
        Ok(true)
    }

    pub fn revert_stream(&mut self, file_id: u64) -> Result<bool> {
        let stream = self
            .streams
            .get_mut(&file_id)
            .ok_or_else(|| Error::not_found("stream", file_id))?;
        let Some(previous) = stream.previous.take() else {
            return Ok(false);
        };
        stream.data = previous;
        Ok(true)
    }

    pub fn set_video_data(&mut self, file_id: u64, data: Vec<u8>) -> Result<bool> {
        let video = self
            .videos
            .get_mut(&file_id)
            .ok_or_else(|| Error::not_found("video", file_id))?;
        if video.payload() == data.as_slice() {
            return Ok(false);
        }
        video.replacement = if data == video.data { None } else { Some(data) };
        Ok(true)
    }

    pub fn revert_video(&mut self, file_id: u64) -> Result<bool> {
        let video = self
            .videos
            .get_mut(&file_id)
            .ok_or_else(|| Error::not_found("video", file_id))?;
        Ok(video.replacement.take().is_some())
    }

    // ---- strings ----

    /// Strings of every text bank visible in `ctx`; the first bank holding an
    /// id wins.
    pub fn strings(&self, ctx: &SessionContext) -> IndexMap<u32, &str> {
        let mut out = IndexMap::new();
        for bank in self.text_banks.values().filter(|b| ctx.exposes(b.language)) {
            for (id, entry) in &bank.strings {
                out.entry(*id).or_insert(entry.text.as_str());
            }
        }
        out
    }

    /// Sets string `id` in every visible text bank that has it.
    pub fn set_string(&mut self, ctx: &SessionContext, id: u32, text: &str) -> Result<bool> {
        let mut found = false;
        let mut changed = false;
        for bank in self
            .text_banks
            .values_mut()
            .filter(|b| ctx.exposes(b.language))
        {
            if let Some(entry) = bank.strings.get_mut(&id) {
                found = true;
                changed |= entry.set(text);
            }
        }
        if !found {
            return Err(Error::not_found("string", id));
        }
        Ok(changed)
    }

    pub fn revert_string(&mut self, ctx: &SessionContext, id: u32) -> Result<bool> {
        let mut found = false;
        let mut changed = false;
        for bank in self
            .text_banks
            .values_mut()
            .filter(|b| ctx.exposes(b.language))
        {
            if let Some(entry) = bank.strings.get_mut(&id) {
                found = true;
                changed |= entry.revert();
            }
        }
        if !found {
            return Err(Error::not_found("string", id));
        }
        Ok(changed)
    }

    // ---- bookkeeping ----

    pub fn modified(&self) -> ModifiedSet {
        ModifiedSet {
            audio: keys_where(&self.audio, AudioSource::is_modified),
            hierarchy: keys_where(&self.hierarchy, HircEntry::is_modified),
            banks: keys_where(&self.banks, Bank::is_modified),
            streams: keys_where(&self.streams, StreamRecord::is_modified),
            text_banks: keys_where(&self.text_banks, TextBank::is_modified),
            videos: keys_where(&self.videos, VideoSource::is_modified),
        }
    }

    /// Reverts every edit. Audio goes first so `mem_size` syncs settle before
    /// entries are restored.
    pub fn revert_all(&mut self) -> Result<()> {
        for id in keys_where(&self.audio, AudioSource::is_modified) {
            self.revert_audio(id)?;
        }
        for id in keys_where(&self.hierarchy, HircEntry::is_modified) {
            self.revert_entry(id)?;
        }
        for stream in self.streams.values_mut() {
            if let Some(previous) = stream.previous.take() {
                stream.data = previous;
            }
        }
        for bank in self.text_banks.values_mut() {
            bank.revert_all();
        }
        for video in self.videos.values_mut() {
            video.replacement = None;
        }
        Ok(())
    }

    /// What a patch has to carry, optionally limited to the records listed in
    /// `within`: dirty banks with their dependency, entries and referenced
    /// audio; dirty streams with their linked audio; modified text banks and
    /// videos.
    pub fn patch_ids(&self, within: Option<&AssetIds>) -> AssetIds {
        let mut ids = AssetIds::default();
        for (file_id, bank) in &self.banks {
            if !bank.is_modified() || within.is_some_and(|w| !w.banks.contains(file_id)) {
                continue;
            }
            ids.banks.insert(*file_id);
            if self.dependencies.contains_key(file_id) {
                ids.dependencies.insert(*file_id);
            }
            for entry_id in &bank.hierarchy {
                let Some(entry) = self.hierarchy.get(entry_id) else {
                    continue;
                };
                ids.hierarchy.insert(*entry_id);
                for source in entry.body.sources() {
                    if self.audio.contains_key(&source.source_id) {
                        ids.audio.insert(source.source_id);
                    }
                }
            }
        }
        for (file_id, stream) in &self.streams {
            if !stream.is_modified() || within.is_some_and(|w| !w.streams.contains(file_id)) {
                continue;
            }
            ids.streams.insert(*file_id);
            if let Some(source) = stream.source.filter(|s| self.audio.contains_key(s)) {
                ids.audio.insert(source);
            }
        }
        for (file_id, bank) in &self.text_banks {
            if bank.is_modified() && within.map_or(true, |w| w.text_banks.contains(file_id)) {
                ids.text_banks.insert(*file_id);
            }
        }
        for (file_id, video) in &self.videos {
            if video.is_modified() && within.map_or(true, |w| w.videos.contains(file_id)) {
                ids.videos.insert(*file_id);
            }
        }
        ids
    }

    /// Clones the selected entities, keeping this store's order.
    pub fn subset(&self, ids: &AssetIds) -> AssetStore {
        AssetStore {
            header_unknown: self.header_unknown,
            header_reserved: self.header_reserved,
            streams: pick(&self.streams, &ids.streams),
            banks: pick(&self.banks, &ids.banks),
            dependencies: pick(&self.dependencies, &ids.dependencies),
            text_banks: pick(&self.text_banks, &ids.text_banks),
            videos: pick(&self.videos, &ids.videos),
            audio: pick(&self.audio, &ids.audio),
            hierarchy: pick(&self.hierarchy, &ids.hierarchy),
        }
    }

    /// Removes entry `id`. An edited entry first lowers the flags it raised on
    /// its banks and parent.
    pub fn remove_entry(&mut self, id: u32) -> Option<HircEntry> {
        if let Some(entry) = self.hierarchy.get(&id).filter(|e| e.is_modified()) {
            let parent = entry.parent_id();
            self.shift_entry_flags(id, parent, false);
        }
        self.hierarchy.shift_remove(&id)
    }

    /// Removes audio source `id`. An edited source first lowers its owners.
    pub fn remove_audio(&mut self, id: u32) -> Option<AudioSource> {
        if let Some(audio) = self.audio.get(&id).filter(|a| a.is_modified()) {
            let owners: Vec<Owner> = audio.parents.iter().copied().collect();
            for owner in owners {
                self.bump(owner, false);
            }
        }
        self.audio.shift_remove(&id)
    }

    /// Drops references to removed banks, entries, streams and audio.
    pub fn detach(&mut self, banks: &[u64], entries: &[u32], streams: &[u64], audio: &[u32]) {
        let gone: IndexSet<Owner> = banks
            .iter()
            .map(|id| Owner::Bank(*id))
            .chain(entries.iter().map(|id| Owner::Entry(*id)))
            .chain(streams.iter().map(|id| Owner::Stream(*id)))
            .collect();
        if !gone.is_empty() {
            for source in self.audio.values_mut() {
                source.parents.retain(|owner| !gone.contains(owner));
            }
        }
        for entry in self.hierarchy.values_mut() {
            entry.soundbanks.retain(|bank| !banks.contains(bank));
        }
        if !entries.is_empty() {
            for bank in self.banks.values_mut() {
                bank.hierarchy.retain(|id| !entries.contains(id));
            }
        }
        for stream in self.streams.values_mut() {
            if stream.source.is_some_and(|s| audio.contains(&s)) {
                stream.source = None;
            }
        }
    }
}

fn wrong_variant(id: u32, expected: &'static str, found: &HircBody) -> Error {
    Error::WrongVariant {
        id,
        expected,
        found: found.kind_name(),
    }
}

fn keys_where<K: Copy + std::hash::Hash + Eq, V>(
    map: &IndexMap<K, V>,
    predicate: impl Fn(&V) -> bool,
) -> Vec<K> {
    map.iter()
        .filter(|(_, v)| predicate(v))
        .map(|(k, _)| *k)
        .collect()
}

fn pick<K, V>(map: &IndexMap<K, V>, ids: &IndexSet<K>) -> IndexMap<K, V>
where
    K: Copy + std::hash::Hash + Eq,
    V: Clone,
{
    map.iter()
        .filter(|(k, _)| ids.contains(*k))
        .map(|(k, v)| (*k, v.clone()))
        .collect()
}
