use voiceforge::format::{AudioFormat, FormatProbe, SampleFormat};

fn fmt(sr: u32, ch: u8) -> AudioFormat {
    AudioFormat { sample_format: SampleFormat::S16, channels: ch, sample_rate: sr }
}

#[test]
fn identical_formats_are_compatible() {
    assert!(FormatProbe::compatible(&fmt(44_100, 2), &fmt(44_100, 2)));
}

#[test]
fn differing_sample_rate_is_incompatible() {
    assert!(!FormatProbe::compatible(&fmt(44_100, 2), &fmt(48_000, 2)));
}

#[test]
fn differing_channel_count_is_incompatible() {
    assert!(!FormatProbe::compatible(&fmt(44_100, 2), &fmt(44_100, 1)));
}

#[test]
fn differing_sample_format_is_incompatible() {
    let a = fmt(44_100, 2);
    let mut b = fmt(44_100, 2);
    b.sample_format = SampleFormat::F32;
    assert!(!FormatProbe::compatible(&a, &b));
}
