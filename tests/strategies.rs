use dev9::Uevent;
use proptest::prelude::*;

// --- Fixed event schema ---
// SUBSYSTEM : one of SUBSYSTEMS
// DEVPATH   : "/devices/<name>", name drawn from NAMES
// MAJOR     : 0..=12
// MINOR     : 0..=12
// plus up to three extra KEY=VALUE attributes

pub const SUBSYSTEMS: &[&str] = &["tty", "block", "net", "input", "mem"];
const NAMES: &[&str] = &["tty1", "sda", "sda1", "eth0", "event3", "null"];
const EXTRA_KEYS: &[&str] = &["ACTION", "DEVTYPE", "MODALIAS", "SEQNUM"];

/// An event with a usable device number.
pub fn arb_event() -> impl Strategy<Value = Uevent> {
    (1_u32..=12, 0_u32..=12).prop_flat_map(|(major, minor)| event_with(major, minor))
}

/// An event whose major and minor are both zero, or absent.
pub fn arb_unaddressable_event() -> impl Strategy<Value = Uevent> {
    (event_with(0, 0), any::<bool>()).prop_map(|(event, keep_numbers)| {
        if keep_numbers {
            event
        } else {
            let mut stripped = Uevent::new(event.header());
            for (key, value) in event.attributes().iter().collect::<Vec<_>>().into_iter().rev() {
                if key != "MAJOR" && key != "MINOR" {
                    stripped = stripped.set(key, value.as_string().unwrap_or_default());
                }
            }
            stripped
        }
    })
}

fn event_with(major: u32, minor: u32) -> impl Strategy<Value = Uevent> {
    (
        prop::sample::select(SUBSYSTEMS),
        prop::sample::select(NAMES),
        prop::collection::vec(
            (prop::sample::select(EXTRA_KEYS), "[a-z0-9:=]{0,8}"),
            0..=3,
        ),
    )
        .prop_map(move |(subsystem, name, extras)| {
            let mut event = Uevent::new(&format!("add@/devices/{name}"))
                .set("SUBSYSTEM", subsystem)
                .set("DEVPATH", &format!("/devices/{name}"))
                .set("MAJOR", &major.to_string())
                .set("MINOR", &minor.to_string());
            for (key, value) in extras {
                event = event.set(key, &value);
            }
            event
        })
}

/// Several events in wire format, plus the events themselves.
pub fn arb_event_stream() -> impl Strategy<Value = (Vec<Uevent>, Vec<u8>)> {
    prop::collection::vec(arb_event(), 0..6).prop_map(|events| {
        let bytes = events.iter().flat_map(Uevent::to_bytes).collect();
        (events, bytes)
    })
}

/// Split points into a byte buffer of length `len`, sorted.
pub fn arb_splits(len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..=len, 0..8).prop_map(|mut cuts| {
        cuts.sort_unstable();
        cuts
    })
}

/// One directive in rule source form.
pub fn arb_directive() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0_u32..=0o777).prop_map(|mode| format!("(set-mode 0{mode:o})")),
        prop::sample::select(&["root", "uucp", "daemon"][..])
            .prop_map(|user| format!("(set-user \"{user}\")")),
        prop::sample::select(&["disk", "tty", "dialout"][..])
            .prop_map(|group| format!("(set-group \"{group}\")")),
        Just("(set-attribute block-device)".to_owned()),
        prop::sample::select(&["\"a\"", "DEV-BASE-PATH", "SUBSYSTEM DEV-BASE-PATH", "\"d\" \"e\""][..])
            .prop_map(|path| format!("(mknod {path})")),
        prop::sample::select(SUBSYSTEMS)
            .prop_map(|subsystem| format!("(match (SUBSYSTEM . \"^{subsystem}$\"))")),
    ];
    leaf.prop_recursive(2, 8, 2, |inner| {
        (prop::sample::select(SUBSYSTEMS), inner)
            .prop_map(|(subsystem, body)| format!("(when (match (SUBSYSTEM . \"^{subsystem}$\")) {body})"))
    })
}

/// A whole rule file.
pub fn arb_rules_source() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_directive(), 0..8).prop_map(|forms| forms.join("\n"))
}
