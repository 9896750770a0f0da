// ABOUTME: End-to-end demo: synthetic packet source through the full pipeline
// ABOUTME: Feeds the decoder worker, scheduler, and cpal sink for N seconds

use clap::Parser;
use gamestream_audio::audio::decode::StreamDecoder;
use gamestream_audio::audio::types::StreamParams;
use gamestream_audio::error::Error;
use gamestream_audio::{AudioPipeline, ConfigSlot, SchedulerHandle, SessionOptions};
use gamestream_audio::audio::output::CpalSink;
use std::f32::consts::TAU;
use std::time::{Duration, Instant};

/// Local playback demo for the audio pipeline
#[derive(Parser, Debug)]
#[command(name = "player")]
#[command(about = "Drive the audio pipeline into the default output device", long_about = None)]
struct Args {
    /// Sample rate in Hz
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,

    /// Channel count
    #[arg(long, default_value_t = 2)]
    channels: u8,

    /// Samples per channel per packet
    #[arg(long, default_value_t = 240)]
    samples_per_frame: u32,

    /// Jitter target override in ms (0 = default 100)
    #[arg(long, default_value_t = 0)]
    jitter_ms: u32,

    /// Tone frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    frequency: f32,

    /// How long to play, in seconds
    #[arg(long, default_value_t = 5)]
    seconds: u64,
}

/// Stand-in codec: ignores packet contents and synthesizes a sine frame,
/// so the demo runs without a live stream to decode.
struct ToneDecoder {
    params: StreamParams,
    frequency: f32,
    phase: f32,
}

impl StreamDecoder for ToneDecoder {
    fn decode(&mut self, _packet: &[u8], out: &mut [i16]) -> Result<usize, Error> {
        let step = TAU * self.frequency / self.params.sample_rate as f32;
        let channels = self.params.channels as usize;
        for frame in out.chunks_exact_mut(channels) {
            let sample = (self.phase.sin() * 0.2 * 32767.0) as i16;
            frame.fill(sample);
            self.phase = (self.phase + step) % TAU;
        }
        Ok(self.params.samples_per_frame as usize)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let params = StreamParams {
        sample_rate: args.sample_rate,
        channels: args.channels,
        samples_per_frame: args.samples_per_frame,
    };
    let options = SessionOptions::builder()
        .jitter_ms_override(args.jitter_ms)
        .build();
    let decoder = Box::new(ToneDecoder {
        params,
        frequency: args.frequency,
        phase: 0.0,
    });

    let slot = ConfigSlot::new();
    let pipeline = AudioPipeline::start(params, options, decoder, &slot)?;

    let sample_rate = args.sample_rate;
    let channels = args.channels;
    let mut scheduler =
        SchedulerHandle::start(slot.clone(), move || CpalSink::new(sample_rate, channels, None))?;
    println!("Playing {}Hz tone for {}s...", args.frequency, args.seconds);

    // Emulate the network callback: one encoded packet per frame duration
    let frame_duration = Duration::from_secs_f64(params.frame_duration_ms() / 1000.0);
    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let packet = [0u8; 64];
    while Instant::now() < deadline {
        pipeline.push_packet(&packet);
        std::thread::sleep(frame_duration);
    }

    let stats = pipeline.stats();
    println!(
        "done: rejected={} dropped_oldest={} decode_failures={} ring_overflows={}",
        stats.rejected_packets, stats.dropped_oldest, stats.decode_failures, stats.ring_overflows
    );

    scheduler.stop();
    drop(pipeline);

    Ok(())
}
