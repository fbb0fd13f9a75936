//! Hand-assembled fixtures. Nothing here calls into the crate's encoders, so
//! decode and round-trip tests compare against an independent layout.
#![allow(dead_code)]

pub const WWISE_STREAM: u64 = 0x504B55235D21440E;
pub const WWISE_BANK: u64 = 0x535A7BD3E650D799;
pub const WWISE_DEP: u64 = 0xAF32095C82F2B070;
pub const TEXT_BANK: u64 = 0x0D972BAB10B40FD3;
pub const BINK_VIDEO: u64 = 0xAA5965F03029FA18;

pub const CODEC_PLUGIN: u32 = 0x0004_0001;

pub const EMBEDDED: u8 = 0;
pub const PREFETCH: u8 = 1;
pub const STREAM: u8 = 2;

fn push_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_f64(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn pad16(out: &mut Vec<u8>) {
    while out.len() % 16 != 0 {
        out.push(0);
    }
}

// ---- TOC container ----

#[derive(Debug, Clone)]
pub struct Rec {
    pub file_id: u64,
    pub type_id: u64,
    pub toc: Vec<u8>,
    pub stream: Option<Vec<u8>>,
}

impl Rec {
    pub fn new(file_id: u64, type_id: u64, toc: Vec<u8>) -> Self {
        Self {
            file_id,
            type_id,
            toc,
            stream: None,
        }
    }

    pub fn with_stream(mut self, stream: Vec<u8>) -> Self {
        self.stream = Some(stream);
        self
    }
}

fn group_rank(type_id: u64) -> usize {
    [WWISE_STREAM, WWISE_BANK, WWISE_DEP, TEXT_BANK, BINK_VIDEO]
        .iter()
        .position(|t| *t == type_id)
        .unwrap_or(usize::MAX)
}

/// Lays records out the way the game tools do: grouped by type in the fixed
/// order, payloads 16-byte aligned, stream payloads padded to 16.
pub fn build_toc(recs: &[Rec], unknown: u32) -> (Vec<u8>, Vec<u8>) {
    let mut sorted: Vec<&Rec> = recs.iter().collect();
    sorted.sort_by_key(|r| group_rank(r.type_id));

    let mut groups: Vec<(u64, u64)> = Vec::new();
    for rec in &sorted {
        match groups.last_mut() {
            Some((t, n)) if *t == rec.type_id => *n += 1,
            _ => groups.push((rec.type_id, 1)),
        }
    }

    let table_end = 72 + groups.len() * 32 + sorted.len() * 80;
    let mut data = vec![0u8; table_end];
    pad16(&mut data);
    let mut stream = Vec::new();

    let mut records = Vec::new();
    let mut index_in_group = 0u32;
    let mut last_type = None;
    for rec in &sorted {
        if last_type != Some(rec.type_id) {
            index_in_group = 0;
            last_type = Some(rec.type_id);
        }
        let toc_offset = data.len() as u64;
        data.extend_from_slice(&rec.toc);
        pad16(&mut data);
        let (stream_offset, stream_size) = match &rec.stream {
            Some(payload) => {
                let at = stream.len() as u64;
                stream.extend_from_slice(payload);
                pad16(&mut stream);
                (at, payload.len() as u32)
            }
            None => (0, 0),
        };

        let mut r = Vec::new();
        push_u64(&mut r, rec.file_id);
        push_u64(&mut r, rec.type_id);
        push_u64(&mut r, toc_offset);
        push_u64(&mut r, stream_offset);
        push_u64(&mut r, 0);
        push_u64(&mut r, 0);
        push_u64(&mut r, 0);
        push_u32(&mut r, rec.toc.len() as u32);
        push_u32(&mut r, stream_size);
        push_u32(&mut r, 0);
        push_u32(&mut r, 16);
        push_u32(&mut r, 64);
        push_u32(&mut r, index_in_group);
        records.extend(r);
        index_in_group += 1;
    }

    let mut head = Vec::new();
    push_u32(&mut head, 0xF000_0011);
    push_u32(&mut head, groups.len() as u32);
    push_u32(&mut head, sorted.len() as u32);
    push_u32(&mut head, unknown);
    head.extend_from_slice(&[0u8; 56]);
    for (type_id, count) in &groups {
        push_u64(&mut head, 0);
        push_u64(&mut head, *type_id);
        push_u64(&mut head, *count);
        push_u32(&mut head, 16);
        push_u32(&mut head, 64);
    }
    head.extend(records);
    data[..head.len()].copy_from_slice(&head);
    (data, stream)
}

// ---- soundbank ----

pub fn chunk(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    push_u32(&mut out, data.len() as u32);
    out.extend_from_slice(data);
    out
}

pub fn bkhd(version: u32, bank_id: u32) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, version);
    push_u32(&mut out, bank_id);
    push_u32(&mut out, 0);
    push_u32(&mut out, 0);
    out
}

/// `(didx, data)` with 16-byte aligned offsets and no trailing padding.
pub fn media(items: &[(u32, &[u8])]) -> (Vec<u8>, Vec<u8>) {
    let mut didx = Vec::new();
    let mut data = Vec::new();
    for (id, payload) in items {
        pad16(&mut data);
        push_u32(&mut didx, *id);
        push_u32(&mut didx, data.len() as u32);
        push_u32(&mut didx, payload.len() as u32);
        data.extend_from_slice(payload);
    }
    (didx, data)
}

pub fn hirc(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, entries.len() as u32);
    for entry in entries {
        out.extend_from_slice(entry);
    }
    out
}

/// Wrapper header + chunk stream, chunks in BKHD, DIDX, DATA, HIRC, misc order.
pub fn bank_payload(
    version: u32,
    bank_id: u32,
    media_items: &[(u32, &[u8])],
    entries: &[Vec<u8>],
    misc: &[([u8; 4], Vec<u8>)],
) -> Vec<u8> {
    let mut body = chunk(b"BKHD", &bkhd(version, bank_id));
    if !media_items.is_empty() {
        let (didx, data) = media(media_items);
        body.extend(chunk(b"DIDX", &didx));
        body.extend(chunk(b"DATA", &data));
    }
    body.extend(chunk(b"HIRC", &hirc(entries)));
    for (tag, data) in misc {
        body.extend(chunk(tag, data));
    }
    let mut out = Vec::new();
    push_u32(&mut out, 0x0000_00AB);
    push_u32(&mut out, body.len() as u32);
    push_u32(&mut out, 0xCDCD_CDCD);
    push_u32(&mut out, 0);
    out.extend(body);
    out
}

pub fn dependency(path: &str) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, 0x6B7A_9DB0);
    push_u32(&mut out, path.len() as u32);
    out.extend_from_slice(path.as_bytes());
    out
}

pub fn text_bank(language: u32, strings: &[(u32, &str)]) -> Vec<u8> {
    let mut out = b"\xAE\xF3\x85\x3E\x01\x00\x00\x00".to_vec();
    push_u32(&mut out, strings.len() as u32);
    push_u32(&mut out, language);
    for (id, _) in strings {
        push_u32(&mut out, *id);
    }
    let mut offset = 16 + 8 * strings.len() as u32;
    for (_, text) in strings {
        push_u32(&mut out, offset);
        offset += text.len() as u32 + 1;
    }
    for (_, text) in strings {
        out.extend_from_slice(text.as_bytes());
        out.push(0);
    }
    out
}

/// A codec payload with sample rate at byte 24 and sample count at byte 44.
pub fn wem(rate: u32, samples: u32, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len.max(48)];
    out[..4].copy_from_slice(b"RIFF");
    out[24..28].copy_from_slice(&rate.to_le_bytes());
    out[44..48].copy_from_slice(&samples.to_le_bytes());
    for (i, byte) in out.iter_mut().enumerate().skip(48) {
        *byte = (i % 251) as u8;
    }
    out
}

// ---- hierarchy entries ----

pub fn record(tag: u8, id: u32, body: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    push_u32(&mut out, body.len() as u32 + 4);
    push_u32(&mut out, id);
    out.extend_from_slice(body);
    out
}

/// Smallest valid parameter block with a parent and optional properties.
pub fn base_params(version: u32, parent: u32, props: &[(u8, u32)]) -> Vec<u8> {
    let mut out = vec![0u8, 0]; // fx chain: override, count
    out.extend_from_slice(&[0, 0]); // fx metadata: override, count
    if version == 154 {
        push_u8(&mut out, 0);
    }
    push_u32(&mut out, 0); // override bus
    push_u32(&mut out, parent);
    push_u8(&mut out, 0); // flags
    push_u8(&mut out, props.len() as u8);
    for (id, _) in props {
        push_u8(&mut out, *id);
    }
    for (_, value) in props {
        push_u32(&mut out, *value);
    }
    push_u8(&mut out, 0); // ranged props
    push_u8(&mut out, 0); // positioning bits
    push_u8(&mut out, 0); // aux flags
    push_u32(&mut out, 0); // reflections bus
    out.extend_from_slice(&[0u8; 6]); // advanced settings
    push_u8(&mut out, 0); // state props
    push_u8(&mut out, 0); // state groups
    push_u16(&mut out, 0); // rtpcs
    out
}

pub fn bank_source(source_id: u32, stream_type: u8, mem_size: u32) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, CODEC_PLUGIN);
    push_u8(&mut out, stream_type);
    push_u32(&mut out, source_id);
    push_u32(&mut out, mem_size);
    push_u8(&mut out, 0);
    out
}

pub fn sound(version: u32, id: u32, source_id: u32, stream_type: u8, mem_size: u32, parent: u32) -> Vec<u8> {
    let mut body = bank_source(source_id, stream_type, mem_size);
    body.extend(base_params(version, parent, &[]));
    record(2, id, &body)
}

/// `sources`: `(source_id, stream_type, mem_size)`, `clips`: `(source_id, duration)`.
pub fn music_track(
    version: u32,
    id: u32,
    sources: &[(u32, u8, u32)],
    clips: &[(u32, f64)],
    parent: u32,
) -> Vec<u8> {
    let mut body = vec![0u8];
    push_u32(&mut body, sources.len() as u32);
    for (source_id, stream_type, mem_size) in sources {
        body.extend(bank_source(*source_id, *stream_type, *mem_size));
    }
    push_u32(&mut body, clips.len() as u32);
    for (i, (source_id, duration)) in clips.iter().enumerate() {
        push_u32(&mut body, i as u32);
        push_u32(&mut body, *source_id);
        push_u32(&mut body, 0);
        push_f64(&mut body, 0.0);
        push_f64(&mut body, 0.0);
        push_f64(&mut body, 0.0);
        push_f64(&mut body, *duration);
    }
    if !clips.is_empty() {
        push_u32(&mut body, 1);
    }
    push_u32(&mut body, 0); // clip automation
    body.extend(base_params(version, parent, &[]));
    body.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]); // tail
    record(11, id, &body)
}

pub fn music_segment(
    version: u32,
    id: u32,
    parent: u32,
    children: &[u32],
    duration: f64,
    markers: &[(u32, f64, &str)],
) -> Vec<u8> {
    let mut body = vec![0u8];
    body.extend(base_params(version, parent, &[]));
    push_u32(&mut body, children.len() as u32);
    for child in children {
        push_u32(&mut body, *child);
    }
    push_f64(&mut body, 500.0);
    push_f64(&mut body, 0.0);
    body.extend_from_slice(&120.0f32.to_le_bytes());
    body.extend_from_slice(&[4, 4, 0]);
    push_u32(&mut body, 0); // stingers
    push_f64(&mut body, duration);
    push_u32(&mut body, markers.len() as u32);
    for (marker_id, position, name) in markers {
        push_u32(&mut body, *marker_id);
        push_f64(&mut body, *position);
        body.extend_from_slice(name.as_bytes());
        body.push(0);
    }
    record(10, id, &body)
}

pub fn actor_mixer(version: u32, id: u32, parent: u32, children: &[u32]) -> Vec<u8> {
    let mut body = base_params(version, parent, &[]);
    push_u32(&mut body, children.len() as u32);
    for child in children {
        push_u32(&mut body, *child);
    }
    record(7, id, &body)
}

pub fn event(id: u32, actions: &[u32]) -> Vec<u8> {
    let mut body = vec![actions.len() as u8];
    for action in actions {
        push_u32(&mut body, *action);
    }
    record(4, id, &body)
}

pub fn play_action(id: u32, target: u32, bank_id: u32) -> Vec<u8> {
    let mut body = Vec::new();
    push_u16(&mut body, 0x0403);
    push_u32(&mut body, target);
    push_u8(&mut body, 0);
    push_u8(&mut body, 0); // props
    push_u8(&mut body, 0); // ranged props
    push_u8(&mut body, 4); // fade curve
    push_u32(&mut body, bank_id);
    record(3, id, &body)
}

/// Parameter block with every optional part present: an fx slot and fx
/// metadata, 3D positioning with an automation path, aux buses, a state
/// group and an RTPC curve.
pub fn full_base_params(version: u32, parent: u32) -> Vec<u8> {
    let mut out = vec![1u8, 1, 0]; // fx chain: override, count, bypass
    push_u8(&mut out, 0); // slot index
    push_u32(&mut out, 0xF00D);
    out.extend_from_slice(&[1, 0]); // share set, rendered
    out.extend_from_slice(&[0, 1]); // fx metadata: override, count
    push_u8(&mut out, 0);
    push_u32(&mut out, 0xF00E);
    push_u8(&mut out, 0);
    if version == 154 {
        push_u8(&mut out, 1);
    }
    push_u32(&mut out, 0x77); // override bus
    push_u32(&mut out, parent);
    push_u8(&mut out, 0x02);
    out.extend_from_slice(&[2, 0x00, 0x06]); // props
    out.extend_from_slice(&(-3.0f32).to_le_bytes());
    push_u32(&mut out, 5);
    out.extend_from_slice(&[1, 0x0B]); // ranged props
    out.extend_from_slice(&(-1.0f32).to_le_bytes());
    out.extend_from_slice(&1.0f32.to_le_bytes());
    push_u8(&mut out, 0x23); // positioning: enabled, 3D, path automation
    push_u8(&mut out, 0x04); // 3D bits
    push_u8(&mut out, 0x01); // path mode
    push_u32(&mut out, 250); // transition time
    push_u32(&mut out, 2); // vertices
    out.extend_from_slice(&[0x11; 32]);
    push_u32(&mut out, 1); // play list items
    out.extend_from_slice(&[0x22; 8]);
    out.extend_from_slice(&[0x33; 12]);
    push_u8(&mut out, 0x08); // aux flags: has aux
    for bus in [0xA1, 0xA2, 0xA3, 0xA4] {
        push_u32(&mut out, bus);
    }
    push_u32(&mut out, 0xA5); // reflections bus
    out.extend_from_slice(&[1, 2, 3, 4, 5, 6]); // advanced settings
    out.extend_from_slice(&[1, 0x05, 0, 1]); // state props: count, id, accum, in_db
    push_u8(&mut out, 1); // state groups
    push_u32(&mut out, 0x5000);
    push_u8(&mut out, 2); // sync type
    push_u8(&mut out, 2); // states
    for (state, instance) in [(0x5001, 0x6001), (0x5002, 0x6002)] {
        push_u32(&mut out, state);
        push_u32(&mut out, instance);
    }
    push_u16(&mut out, 1); // rtpcs
    push_u32(&mut out, 0x7000);
    out.extend_from_slice(&[0, 1]); // type, accum
    out.extend_from_slice(&[0x81, 0x00]); // param id 128
    push_u32(&mut out, 0x7001); // curve id
    push_u8(&mut out, 2); // scaling
    push_u16(&mut out, 2);
    for (from, to) in [(0.0f32, -6.0f32), (100.0, 0.0)] {
        out.extend_from_slice(&from.to_le_bytes());
        out.extend_from_slice(&to.to_le_bytes());
        push_u32(&mut out, 4);
    }
    out
}

fn push_children(out: &mut Vec<u8>, children: &[u32]) {
    push_u32(out, children.len() as u32);
    for child in children {
        push_u32(out, *child);
    }
}

/// `playlist`: `(play_id, weight)`.
pub fn random_sequence(
    version: u32,
    id: u32,
    parent: u32,
    children: &[u32],
    playlist: &[(u32, i32)],
) -> Vec<u8> {
    let mut body = base_params(version, parent, &[]);
    push_u16(&mut body, 2); // loop count
    push_u16(&mut body, 0);
    push_u16(&mut body, 0);
    body.extend_from_slice(&1.5f32.to_le_bytes()); // transition time
    body.extend_from_slice(&0.0f32.to_le_bytes());
    body.extend_from_slice(&0.0f32.to_le_bytes());
    push_u16(&mut body, 1); // avoid repeat count
    body.extend_from_slice(&[0, 1, 0, 0x12]); // transition mode, random mode, mode, flags
    push_children(&mut body, children);
    push_u16(&mut body, playlist.len() as u16);
    for (play_id, weight) in playlist {
        push_u32(&mut body, *play_id);
        body.extend_from_slice(&weight.to_le_bytes());
    }
    record(5, id, &body)
}

/// `groups`: `(switch_id, nodes)`; one switch param per child.
pub fn switch_container(
    version: u32,
    id: u32,
    parent: u32,
    children: &[u32],
    groups: &[(u32, &[u32])],
) -> Vec<u8> {
    let mut body = base_params(version, parent, &[]);
    push_u8(&mut body, 0); // group type
    push_u32(&mut body, 0x9000); // group id
    push_u32(&mut body, 0x9001); // default switch
    push_u8(&mut body, 1); // continuous validation
    push_children(&mut body, children);
    push_u32(&mut body, groups.len() as u32);
    for (switch_id, nodes) in groups {
        push_u32(&mut body, *switch_id);
        push_children(&mut body, nodes);
    }
    push_u32(&mut body, children.len() as u32);
    for child in children {
        push_u32(&mut body, *child);
        body.extend_from_slice(&[1, 0]);
        body.extend_from_slice(&(-100i32).to_le_bytes());
        body.extend_from_slice(&250i32.to_le_bytes());
    }
    record(6, id, &body)
}

pub fn layer_container(version: u32, id: u32, parent: u32, children: &[u32], tail: &[u8]) -> Vec<u8> {
    let mut body = base_params(version, parent, &[]);
    push_children(&mut body, children);
    body.extend_from_slice(tail);
    record(9, id, &body)
}

pub fn music_switch(version: u32, id: u32, parent: u32, children: &[u32], tail: &[u8]) -> Vec<u8> {
    let mut body = vec![0x02u8];
    body.extend(base_params(version, parent, &[]));
    push_children(&mut body, children);
    body.extend_from_slice(tail);
    record(12, id, &body)
}

/// An action with empty prop bundles followed by `params`.
pub fn action(id: u32, action_type: u16, target: u32, params: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    push_u16(&mut body, action_type);
    push_u32(&mut body, target);
    push_u8(&mut body, 0);
    push_u8(&mut body, 0); // props
    push_u8(&mut body, 0); // ranged props
    body.extend_from_slice(params);
    record(3, id, &body)
}

/// Var-len count 1 with a single `{id, is_bus}` exception.
pub fn one_exception(id: u32) -> Vec<u8> {
    let mut out = vec![1u8];
    push_u32(&mut out, id);
    push_u8(&mut out, 0);
    out
}

// ---- whole archives ----

pub const BANK_A: u64 = 0x1111_0000_0000_0001;
pub const BANK_B: u64 = 0x2222_0000_0000_0002;
pub const BANK_PATH_A: &str = "content/audio/sfx_a.bnk";
pub const BANK_PATH_B: &str = "content/audio/sfx_b.bnk";

pub fn bank_recs(file_id: u64, path: &str, payload: Vec<u8>) -> Vec<Rec> {
    vec![
        Rec::new(file_id, WWISE_BANK, payload),
        Rec::new(file_id, WWISE_DEP, dependency(path)),
    ]
}

pub fn stream_rec(file_id: u64, payload: Vec<u8>) -> Rec {
    Rec::new(file_id, WWISE_STREAM, vec![0x5A; 16]).with_stream(payload)
}

/// One bank with an actor-mixer, one embedded Sound (source 100) and a
/// MusicTrack playing source 200 from a stream record.
pub fn single_bank_archive() -> (Vec<u8>, Vec<u8>) {
    let embedded = wem(48000, 48000, 96);
    let streamed = wem(48000, 96000, 160);
    let entries = vec![
        actor_mixer(141, 10, 0, &[20, 30]),
        sound(141, 20, 100, EMBEDDED, embedded.len() as u32, 10),
        music_track(141, 30, &[(200, STREAM, 0)], &[(200, 2000.0)], 10),
        event(40, &[41]),
        play_action(41, 20, 0xB0B),
    ];
    let payload = bank_payload(141, 0xB0B, &[(100, &embedded)], &entries, &[]);
    let mut recs = bank_recs(BANK_A, BANK_PATH_A, payload);
    recs.push(stream_rec(stream_id(BANK_PATH_A, 200), streamed));
    build_toc(&recs, 0x17)
}

/// `hash64(dirname(path) + "/" + source)` through the public hash.
pub fn stream_id(path: &str, source: u32) -> u64 {
    toc_modder::hash::stream_file_id(path, source)
}
