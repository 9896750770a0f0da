// ABOUTME: cpal-backed scheduling sink with a sample-counter clock
// ABOUTME: Output callback mixes scheduled segments at their clock positions

use crate::audio::output::{AudioSink, NodeId, SinkState};
use crate::error::Error;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use log::warn;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One scheduled buffer: planar f32 PCM starting at an absolute sample index.
struct Segment {
    id: NodeId,
    start_sample: u64,
    channels: Vec<Vec<f32>>,
    cursor: usize,
}

struct SinkShared {
    /// Segments ordered by start position; the callback plays the front.
    segments: Mutex<VecDeque<Segment>>,
    /// Samples per channel the output has consumed so far. This is the
    /// audio clock: it advances only while the stream runs.
    clock_samples: AtomicU64,
}

/// Scheduling sink driving a cpal output stream.
///
/// The clock is a per-channel sample counter advanced by the output callback,
/// so it freezes while the stream is paused, matching a host-suspended audio
/// clock. Gaps between scheduled segments render as silence.
pub struct CpalSink {
    shared: Arc<SinkShared>,
    stream: Stream,
    sample_rate: u32,
    suspended: bool,
    next_id: NodeId,
}

impl CpalSink {
    /// Create a sink on the default (or provided) output device.
    pub fn new(sample_rate: u32, channels: u8, device: Option<Device>) -> Result<Self, Error> {
        let host = cpal::default_host();
        let device = match device {
            Some(device) => device,
            None => host
                .default_output_device()
                .ok_or_else(|| Error::Output("No output device available".to_string()))?,
        };

        let config = StreamConfig {
            channels: channels as u16,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(SinkShared {
            segments: Mutex::new(VecDeque::new()),
            clock_samples: AtomicU64::new(0),
        });

        let stream = Self::build_stream(&device, &config, Arc::clone(&shared), channels as usize)?;
        stream
            .play()
            .map_err(|e| Error::Output(e.to_string()))?;

        Ok(Self {
            shared,
            stream,
            sample_rate,
            suspended: false,
            next_id: 1,
        })
    }

    /// Suspend the clock, emulating host policy freezing the output.
    pub fn pause(&mut self) {
        if let Err(e) = self.stream.pause() {
            warn!("sink: pause failed: {e}");
            return;
        }
        self.suspended = true;
    }

    fn build_stream(
        device: &Device,
        config: &StreamConfig,
        shared: Arc<SinkShared>,
        channels: usize,
    ) -> Result<Stream, Error> {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut segments = shared.segments.lock();
                    let mut clock = shared.clock_samples.load(Ordering::Relaxed);
                    let frames = data.len() / channels;
                    let mut out = 0;

                    for _ in 0..frames {
                        while let Some(front) = segments.front() {
                            if front.cursor >= front.channels[0].len() {
                                segments.pop_front();
                            } else {
                                break;
                            }
                        }

                        let mut wrote = false;
                        if let Some(front) = segments.front_mut() {
                            if front.start_sample <= clock {
                                for (ch, plane) in front.channels.iter().enumerate() {
                                    data[out + ch] = plane[front.cursor];
                                }
                                front.cursor += 1;
                                wrote = true;
                            }
                        }
                        if !wrote {
                            for ch in 0..channels {
                                data[out + ch] = 0.0;
                            }
                        }
                        out += channels;
                        clock += 1;
                    }

                    shared.clock_samples.store(clock, Ordering::Release);
                },
                move |err| {
                    warn!("sink: stream error: {err}");
                },
                None,
            )
            .map_err(|e| Error::Output(e.to_string()))?;

        Ok(stream)
    }
}

impl AudioSink for CpalSink {
    fn clock_now(&self) -> f64 {
        self.shared.clock_samples.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn state(&self) -> SinkState {
        if self.suspended {
            SinkState::Suspended
        } else {
            SinkState::Running
        }
    }

    fn resume(&mut self) {
        if let Err(e) = self.stream.play() {
            warn!("sink: resume failed: {e}");
            return;
        }
        self.suspended = false;
    }

    fn submit(&mut self, when: f64, channels: Vec<Vec<f32>>) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        let start_sample = (when.max(0.0) * self.sample_rate as f64).round() as u64;

        let mut segments = self.shared.segments.lock();
        let pos = segments
            .iter()
            .position(|s| s.start_sample > start_sample)
            .unwrap_or(segments.len());
        segments.insert(
            pos,
            Segment {
                id,
                start_sample,
                channels,
                cursor: 0,
            },
        );
        id
    }

    fn cancel(&mut self, node: NodeId) {
        self.shared.segments.lock().retain(|s| s.id != node);
    }
}
