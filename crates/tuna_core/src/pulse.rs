//! Pulse detection: envelope-based onset/offset thresholding with adaptive
//! minima tracking and per-pulse spectral descriptors.

use crate::buffer::{Buffer, Sample, SAMPLE_MAX};
use crate::bufhold::{BufferHold, Handle};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::Consumer;
use crate::sink::Sink;
use crate::timestamp::Timestamp;
use tuna_dsp::{Spectrum, SlidingMinimum, TolBank};

/// Tunable parameters for pulse detection, stable for the stage's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct PulseParams {
    /// Onset analysis window, seconds.
    pub tw: f32,
    /// Envelope decay time constant, seconds.
    pub tc: f32,
    /// Offset-threshold delay line length, seconds.
    pub td: f32,
    pub pulse_max_duration: f32,
    pub pulse_min_decay: f32,
    pub threshold_ratio: i32,
    pub decay_threshold_ratio: i32,
    /// Sets the envelope-to-sample scale as `1 / sample_limit`.
    pub sample_limit: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NonPulse,
    Pulse,
}

struct Results {
    peak_positive: Sample,
    peak_negative: Sample,
    peak_positive_offset: u32,
    peak_negative_offset: u32,
    offset_5: u32,
    offset_95: u32,
    tols: Vec<f32>,
}

impl Results {
    fn zeroed(n_tol: usize) -> Self {
        Results {
            peak_positive: 0,
            peak_negative: 0,
            peak_positive_offset: 0,
            peak_negative_offset: 0,
            offset_5: 0,
            offset_95: 0,
            tols: vec![0.0; n_tol],
        }
    }
}

/// A simple ring buffer delaying every pushed sample by its fixed length.
struct DelayLine {
    data: Vec<Sample>,
    index: usize,
}

impl DelayLine {
    fn new(len: usize) -> Self {
        DelayLine {
            data: vec![0; len.max(1)],
            index: 0,
        }
    }

    /// Push `x`, return the value evicted from the head of the line.
    fn rotate(&mut self, x: Sample) -> Sample {
        let old = self.data[self.index];
        self.data[self.index] = x;
        self.index = (self.index + 1) % self.data.len();
        old
    }
}

pub struct Pulse {
    tol: Option<TolBank>,
    results: Results,
    held_buffers: BufferHold,
    params: PulseParams,
    delay_line: DelayLine,
    sink: Box<dyn Sink>,
    spectrum: Spectrum,
    fft_data: Vec<f32>,
    minima: Option<SlidingMinimum<Sample>>,
    decay: f32,
    scale: f32,
    cur: f32,
    state: State,
    fft_length: usize,
    index: usize,
    n_tol: usize,
    pulse_max_duration_w: usize,
    pulse_min_decay_w: usize,
    threshold: Sample,
    decay_threshold: Sample,
    threshold_limit: Sample,
    decay_threshold_limit: Sample,
    current_min: Sample,
    delayed_min: Sample,
}

impl Pulse {
    pub fn new(sink: Box<dyn Sink>, params: PulseParams) -> Self {
        let threshold_limit = SAMPLE_MAX / params.threshold_ratio;
        let decay_threshold_limit = SAMPLE_MAX / params.decay_threshold_ratio;
        let scale = 1.0 / params.sample_limit;

        Pulse {
            tol: None,
            results: Results::zeroed(0),
            held_buffers: BufferHold::new(),
            params,
            delay_line: DelayLine::new(1),
            sink,
            spectrum: Spectrum::new(),
            fft_data: Vec::new(),
            minima: None,
            decay: 0.0,
            scale,
            cur: 0.0,
            state: State::NonPulse,
            fft_length: 0,
            index: 0,
            n_tol: 0,
            pulse_max_duration_w: 0,
            pulse_min_decay_w: 0,
            threshold: SAMPLE_MAX,
            decay_threshold: 0,
            threshold_limit,
            decay_threshold_limit,
            current_min: 0,
            delayed_min: 0,
        }
    }

    fn calc_envelope(&mut self, x: Sample) -> Sample {
        let f = x as f32;
        self.cur = (self.decay * self.cur).max(f * f);
        let env = (self.cur * self.scale) as Sample;

        let minima = self.minima.as_mut().expect("minima initialised in start()");
        let min = minima.next(env);
        self.threshold = if min <= self.threshold_limit {
            min.saturating_mul(self.params.threshold_ratio)
        } else {
            SAMPLE_MAX
        };

        env
    }

    fn calc_first_envelope(&mut self, x: Sample) {
        let f = x as f32;
        self.cur = f * f;
        let env = (self.cur * self.scale) as Sample;

        let minima = self.minima.as_mut().expect("minima initialised in start()");
        minima.next(env);

        self.threshold = if env <= self.threshold_limit {
            env.saturating_mul(self.params.threshold_ratio)
        } else {
            SAMPLE_MAX
        };
    }

    fn reset_pulse_end(&mut self, env: Sample) {
        self.delayed_min = env;
        self.current_min = env;
        self.decay_threshold = if env <= self.decay_threshold_limit {
            env.saturating_mul(self.params.decay_threshold_ratio)
        } else {
            0
        };
    }

    /// Returns true to exit the pulse.
    fn check_pulse_end(&mut self, env: Sample) -> bool {
        let old = self.delay_line.rotate(env);

        if self.index >= self.pulse_max_duration_w {
            return true;
        }
        if (self.index - self.results.peak_positive_offset as usize) < self.pulse_min_decay_w {
            // Deliberately preserved: delayed_min is not updated on this
            // path, matching the original's early-decay guard.
            return false;
        }

        if old < self.delayed_min {
            self.delayed_min = old;
        }

        if env < self.current_min {
            self.current_min = env;
            self.decay_threshold = if env <= self.decay_threshold_limit {
                env.saturating_mul(self.params.decay_threshold_ratio)
            } else {
                0
            };
        }

        self.delayed_min < self.decay_threshold
    }

    fn process_sample(&mut self, x: Sample) -> bool {
        self.fft_data[self.index] = x as f32;

        let mut new_peak = false;
        if x > self.results.peak_positive {
            self.results.peak_positive = x;
            self.results.peak_positive_offset = self.index as u32;
            new_peak = true;
        } else if x < self.results.peak_negative {
            self.results.peak_negative = x;
            self.results.peak_negative_offset = self.index as u32;
        }

        self.index += 1;
        new_peak
    }

    fn process_data(&mut self, data: &[Sample]) {
        for &x in data {
            self.process_sample(x);
        }
    }

    /// Walk backward through held buffers until `offset` samples of
    /// history are spanned, align the earliest of them to that boundary,
    /// release everything older, and return the aligned handle.
    fn discard_leading_data(&mut self, offset: usize) -> Handle {
        let mut h = self
            .held_buffers
            .newest()
            .expect("pulse: expected retained history is missing");
        let mut i = self.held_buffers.count(h);

        while i < offset {
            h = self
                .held_buffers
                .prev(h)
                .expect("pulse: expected retained history is missing");
            i += self.held_buffers.count(h);
        }

        let _ = self.held_buffers.advance(h, i - offset);

        let mut cur = self.held_buffers.oldest();
        while let Some(c) = cur {
            if c == h {
                break;
            }
            let next = self.held_buffers.next(c);
            self.held_buffers.release(c);
            cur = next;
        }

        h
    }

    fn process_leading_data(&mut self, offset: usize) {
        let mut h = Some(self.discard_leading_data(offset));
        while let Some(handle) = h {
            let data: Vec<Sample> = self.held_buffers.data(handle).to_vec();
            self.process_data(&data);
            let next = self.held_buffers.next(handle);
            self.held_buffers.release(handle);
            h = next;
        }
    }

    fn process_start_pulse(&mut self) {
        self.results = Results::zeroed(self.n_tol);
        self.index = 0;
    }

    fn calc_offsets(&mut self) {
        let n = self.index;
        let energy: f32 = self.fft_data[..n].iter().map(|&x| x * x).sum();
        let energy_5 = energy / 20.0;

        let mut offset_5 = 0usize;
        let mut acc = self.fft_data[0] * self.fft_data[0];
        while acc <= energy_5 {
            offset_5 += 1;
            acc += self.fft_data[offset_5] * self.fft_data[offset_5];
        }
        self.results.offset_5 = offset_5 as u32;

        let mut offset_95 = n - 1;
        let mut acc2 = self.fft_data[offset_95] * self.fft_data[offset_95];
        while acc2 < energy_5 {
            offset_95 -= 1;
            acc2 += self.fft_data[offset_95] * self.fft_data[offset_95];
        }
        self.results.offset_95 = offset_95 as u32;
    }

    fn process_end_pulse(&mut self) -> PipelineResult<()> {
        self.calc_offsets();

        self.fft_data[self.index..self.fft_length].fill(0.0);

        let buf = self.spectrum.open()?;
        buf.copy_from_slice(&self.fft_data);
        let power = self.spectrum.transform()?;

        let tol = self
            .tol
            .as_ref()
            .expect("tol bank initialised by start() before any write()");
        tol.calculate(power, &mut self.results.tols);

        self.write_results()
            .map_err(|e| PipelineError::SinkIo(e.to_string()))
    }

    fn write_results(&mut self) -> std::io::Result<()> {
        self.sink.write_field_sample(self.results.peak_positive);
        self.sink.write_field_sample(self.results.peak_negative);
        self.sink.write_field_uint(self.results.peak_positive_offset);
        self.sink.write_field_uint(self.results.peak_negative_offset);
        self.sink.write_field_uint(self.results.offset_5);
        self.sink.write_field_uint(self.results.offset_95);
        for &tol in &self.results.tols {
            self.sink.write_field_float(tol);
        }
        self.sink.end_record()
    }

    fn detect_data(&mut self, data: &[Sample]) -> PipelineResult<()> {
        let mut start = 0usize;
        if self
            .minima
            .as_ref()
            .expect("minima initialised in start()")
            .is_empty()
        {
            self.calc_first_envelope(data[0]);
            start = 1;
        }

        for i in start..data.len() {
            let env = self.calc_envelope(data[i]);

            if self.state == State::NonPulse && env > self.threshold {
                self.state = State::Pulse;
                self.process_start_pulse();

                let age = self
                    .minima
                    .as_ref()
                    .expect("minima initialised in start()")
                    .current_age();
                let mut start_offset = i as i64 - age;

                if start_offset < 0 {
                    self.process_leading_data((-start_offset) as usize);
                    start_offset = 0;
                }

                let start_offset = start_offset as usize;
                self.process_data(&data[start_offset..i]);
                self.reset_pulse_end(env);
            } else if self.state == State::Pulse {
                if self.process_sample(data[i]) {
                    self.reset_pulse_end(env);
                }

                if self.check_pulse_end(env) {
                    self.state = State::NonPulse;
                    self.process_end_pulse()?;
                }
            }
        }

        Ok(())
    }
}

impl Consumer for Pulse {
    fn start(&mut self, sample_rate: u32, ts: Timestamp) -> PipelineResult<()> {
        self.state = State::NonPulse;

        let tw_w = (self.params.tw * sample_rate as f32).floor() as usize;
        let td_w = (self.params.td * sample_rate as f32).floor() as usize;
        self.decay = (-1.0 / (self.params.tc * sample_rate as f32)).exp();
        self.pulse_min_decay_w = (self.params.pulse_min_decay * sample_rate as f32).floor() as usize;
        self.pulse_max_duration_w =
            (self.params.pulse_max_duration * sample_rate as f32).floor() as usize;

        self.minima = Some(SlidingMinimum::new(tw_w.max(1))?);
        self.delay_line = DelayLine::new(td_w.max(1));

        self.fft_length = self.pulse_max_duration_w.max(1);
        self.fft_data = vec![0.0; self.fft_length];
        self.spectrum.set_length(self.fft_length)?;

        let tol = TolBank::new(sample_rate, self.fft_length, 0.4, 3);
        self.n_tol = tol.num_levels();
        self.results = Results::zeroed(self.n_tol);
        self.tol = Some(tol);

        self.sink
            .write_start(ts)
            .map_err(|e| PipelineError::SinkIo(e.to_string()))
    }

    fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()> {
        let data: Vec<Sample> = buf.as_slice()[..count].to_vec();
        self.detect_data(&data)?;

        let age = self
            .minima
            .as_ref()
            .expect("minima initialised in start()")
            .current_age();
        let start_offset = count as i64 - age;
        if start_offset < 0 {
            self.discard_leading_data((-start_offset) as usize);
        }

        self.held_buffers.add(buf, count);
        Ok(())
    }

    fn resync(&mut self, ts: Timestamp) -> PipelineResult<()> {
        self.held_buffers.release_all();
        self.state = State::NonPulse;
        if let Some(minima) = self.minima.as_mut() {
            minima.reset();
        }
        self.sink
            .write_resync(ts)
            .map_err(|e| PipelineError::SinkIo(e.to_string()))
    }

    fn exit(&mut self) -> PipelineResult<()> {
        self.held_buffers.release_all();
        Ok(())
    }
}
