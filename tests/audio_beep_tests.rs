//! Beep and tone-test playback integration tests

use rust_antenna_pointer::audio::{BeepParams, BeepPlayer};
use rust_antenna_pointer::config::AUDIO_SAMPLE_RATE;
use rust_antenna_pointer::hal::sim::{SimClock, SimDac};
use rust_antenna_pointer::hal::Clock;
use rust_antenna_pointer::CancelToken;

fn loud() -> BeepParams {
    BeepParams {
        volume: 200,
        ..BeepParams::default()
    }
}

#[test]
fn test_default_beep_length() {
    // 180 ms main + 60 ms delay + 180 ms echo at 16 kHz
    let player = BeepPlayer::beep(&loud(), AUDIO_SAMPLE_RATE);
    assert_eq!(player.total_samples(), 6720);
    assert_eq!(player.count(), 6720);
}

#[test]
fn test_play_blocking_paces_samples() {
    let mut dac = SimDac::new();
    let mut clock = SimClock::starting_at(1_000);
    let written = BeepPlayer::beep(&loud(), AUDIO_SAMPLE_RATE)
        .play_blocking(&mut dac, &mut clock, None)
        .unwrap();

    assert_eq!(written, 6720);
    // every sample plus the closing mid-scale
    assert_eq!(dac.writes(), 6721);
    assert_eq!(dac.last(), Some(128));
    assert_eq!(clock.now_us(), 1_000 + 420_000);

    let (lo, hi) = dac.range().unwrap();
    assert!(lo < 100 && hi > 156, "range {}..{}", lo, hi);
}

#[test]
fn test_cancelled_playback_restores_silence() {
    let mut dac = SimDac::new();
    let mut clock = SimClock::new();
    let token = CancelToken::new();
    token.cancel();

    let written = BeepPlayer::beep(&loud(), AUDIO_SAMPLE_RATE)
        .play_blocking(&mut dac, &mut clock, Some(&token))
        .unwrap();
    assert_eq!(written, 0);
    assert_eq!(dac.writes(), 1);
    assert_eq!(dac.last(), Some(128));
    assert!(!token.is_cancelled());
}

#[test]
fn test_poll_waits_for_due_time() {
    let mut dac = SimDac::new();
    let mut player = BeepPlayer::tone(1000, 10, 120, AUDIO_SAMPLE_RATE);

    assert!(player.poll(&mut dac, 500).unwrap());
    assert_eq!(dac.writes(), 1);
    // next sample is 62.5 µs later, truncated to 62
    assert!(player.poll(&mut dac, 520).unwrap());
    assert_eq!(dac.writes(), 1);
    assert_eq!(player.next_due_us(), Some(562));
    assert!(player.poll(&mut dac, 562).unwrap());
    assert_eq!(dac.writes(), 2);
}

#[test]
fn test_boot_tone_is_plain_tone() {
    let samples: Vec<u8> = BeepPlayer::boot_tone(AUDIO_SAMPLE_RATE).collect();
    // 180 ms, no echo tail
    assert_eq!(samples.len(), 2880);
    let peak = samples.iter().map(|s| (*s as i32 - 128).abs()).max().unwrap();
    // 120/255 of a 120 peak
    assert!((55..=57).contains(&peak), "peak {}", peak);
}
