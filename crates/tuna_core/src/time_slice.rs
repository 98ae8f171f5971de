//! Time-slice analysis: half-second blocks of overlapped-window spectral
//! analysis interleaved with non-overlapped time-domain statistics.

use crate::buffer::{Buffer, Sample};
use crate::bufhold::{Advance, BufferHold};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::Consumer;
use crate::sink::Sink;
use crate::timestamp::Timestamp;
use tuna_dsp::{sine_window, Spectrum, TolBank};

struct Accum {
    peak_positive: Sample,
    peak_negative: Sample,
    peak_positive_offset: u32,
    peak_negative_offset: u32,
    sum_1: f32,
    sum_2: f32,
    sum_3: f32,
    sum_4: f32,
    tols: Vec<f32>,
}

impl Accum {
    fn zeroed(n_tol: usize) -> Self {
        Accum {
            peak_positive: 0,
            peak_negative: 0,
            peak_positive_offset: 0,
            peak_negative_offset: 0,
            sum_1: 0.0,
            sum_2: 0.0,
            sum_3: 0.0,
            sum_4: 0.0,
            tols: vec![0.0; n_tol],
        }
    }
}

/// Per-half-second block analyser: a half-second slice period with a
/// full-second (two slice periods) 50%-overlapped analysis window.
pub struct TimeSlice {
    held_buffers: BufferHold,
    sink: Box<dyn Sink>,
    spectrum: Spectrum,
    tol: Option<TolBank>,
    window: Vec<f32>,
    staging: Vec<f32>,
    sample_rate: u32,
    slice_period: usize,
    available: usize,
    n_tol: usize,
    index: usize,
}

impl TimeSlice {
    pub fn new(sink: Box<dyn Sink>) -> Self {
        TimeSlice {
            held_buffers: BufferHold::new(),
            sink,
            spectrum: Spectrum::new(),
            tol: None,
            window: Vec::new(),
            staging: Vec::new(),
            sample_rate: 0,
            slice_period: 0,
            available: 0,
            n_tol: 0,
            index: 0,
        }
    }

    fn process_buffer(
        accum: &mut Accum,
        window: &[f32],
        staging: &mut [f32],
        index: &mut usize,
        slice_period: usize,
        data: &[Sample],
    ) {
        let len = slice_period * 2;
        let mut avail = data.len();
        let mut offset = 0usize;

        if avail > 0 && *index < len / 4 {
            let c = (len / 4 - *index).min(avail);
            for i in 0..c {
                let x = data[i] as f32;
                staging[*index] = x * window[*index];
                *index += 1;
            }
            avail -= c;
            offset = c;
        }

        if avail > 0 && *index < (len * 3 / 4) {
            let c = ((len * 3 / 4) - *index).min(avail);
            for i in 0..c {
                let v = data[offset + i];
                let x = v as f32;
                let e = x * x;
                let e2 = e * e;
                accum.sum_1 += e;
                accum.sum_2 += e2;
                accum.sum_3 += e2 * e;
                accum.sum_4 += e2 * e2;

                if v > accum.peak_positive {
                    accum.peak_positive = v;
                    accum.peak_positive_offset = (*index - len / 4) as u32;
                } else if v < accum.peak_negative {
                    accum.peak_negative = v;
                    accum.peak_negative_offset = (*index - len / 4) as u32;
                }

                staging[*index] = x * window[*index];
                *index += 1;
            }
            avail -= c;
            offset += c;
        }

        if avail > 0 {
            let c = (len - *index).min(avail);
            for i in 0..c {
                let x = data[offset + i] as f32;
                staging[*index] = x * window[*index];
                *index += 1;
            }
        }
    }

    fn process_time_slice(&mut self) -> PipelineResult<()> {
        let mut accum = Accum::zeroed(self.n_tol);
        self.index = 0;
        let slice_period = self.slice_period;

        let mut current = self.held_buffers.oldest();
        while let Some(h) = current {
            let next = self.held_buffers.next(h);
            let start = self.index;
            let data: Vec<Sample> = self.held_buffers.data(h).to_vec();

            Self::process_buffer(
                &mut accum,
                &self.window,
                &mut self.staging,
                &mut self.index,
                slice_period,
                &data,
            );

            if self.index <= slice_period {
                self.held_buffers.release(h);
            } else if start < slice_period {
                let offset = slice_period - start;
                let advanced = self.held_buffers.advance(h, offset);
                debug_assert!(!matches!(advanced, Advance::Consumed));
            }
            current = next;
        }

        let spectrum_buf = self.spectrum.open()?;
        spectrum_buf.copy_from_slice(&self.staging);
        let power = self.spectrum.transform()?;

        let tol = self
            .tol
            .as_ref()
            .expect("tol bank initialised by start() before any write()");
        tol.calculate(power, &mut accum.tols);

        self.write_results(&accum)
            .map_err(|e| PipelineError::SinkIo(e.to_string()))
    }

    fn write_results(&mut self, accum: &Accum) -> std::io::Result<()> {
        self.sink.write_field_sample(accum.peak_positive);
        self.sink.write_field_sample(accum.peak_negative);
        self.sink.write_field_uint(accum.peak_positive_offset);
        self.sink.write_field_uint(accum.peak_negative_offset);
        self.sink.write_field_float(accum.sum_1);
        self.sink.write_field_float(accum.sum_2);
        self.sink.write_field_float(accum.sum_3);
        self.sink.write_field_float(accum.sum_4);
        for &tol in &accum.tols {
            self.sink.write_field_float(tol);
        }
        self.sink.end_record()
    }
}

impl Consumer for TimeSlice {
    fn start(&mut self, sample_rate: u32, ts: Timestamp) -> PipelineResult<()> {
        self.sample_rate = sample_rate;
        self.slice_period = (sample_rate / 2) as usize;
        self.available = 0;

        self.window = sine_window(self.slice_period * 2);
        self.staging = vec![0.0; self.slice_period * 2];

        self.spectrum.set_length(sample_rate as usize)?;

        let tol = TolBank::new(sample_rate, sample_rate as usize, 0.4, 3);
        self.n_tol = tol.num_levels();
        self.tol = Some(tol);

        self.sink
            .write_start(ts)
            .map_err(|e| PipelineError::SinkIo(e.to_string()))
    }

    fn write(&mut self, buf: Buffer, count: usize) -> PipelineResult<()> {
        self.available += count;
        self.held_buffers.add(buf, count);

        while self.available >= self.slice_period {
            self.process_time_slice()?;
            self.available -= self.slice_period;
        }
        Ok(())
    }

    fn resync(&mut self, ts: Timestamp) -> PipelineResult<()> {
        self.held_buffers.release_all();
        self.available = 0;
        self.sink
            .write_resync(ts)
            .map_err(|e| PipelineError::SinkIo(e.to_string()))
    }

    fn exit(&mut self) -> PipelineResult<()> {
        self.held_buffers.release_all();
        Ok(())
    }
}
