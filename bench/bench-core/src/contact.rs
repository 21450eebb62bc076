//! Per-contact-point sample series.

use bench_types::ContactPointSample;
use serde::{Deserialize, Serialize};

/// Samples of every contact point at every recorded step.
///
/// Storage is pre-allocated for a fixed number of steps; unrecorded slots hold
/// [`ContactPointSample::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPointSet {
    frames: Vec<String>,
    /// `samples[contact][step]`
    samples: Vec<Vec<ContactPointSample>>,
}

impl ContactPointSet {
    /// Allocate `steps` samples for each named frame.
    #[must_use]
    pub fn new<S: AsRef<str>>(frames: &[S], steps: usize) -> Self {
        Self {
            frames: frames.iter().map(|f| f.as_ref().to_owned()).collect(),
            samples: vec![vec![ContactPointSample::default(); steps]; frames.len()],
        }
    }

    /// Number of contact points.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of steps per contact point.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    /// Frame names, in contact index order.
    #[must_use]
    pub fn frame_names(&self) -> &[String] {
        &self.frames
    }

    /// Store one sample. Returns `None` if `contact` or `step` is out of range.
    pub fn record(
        &mut self,
        contact: usize,
        step: usize,
        sample: ContactPointSample,
    ) -> Option<()> {
        *self.samples.get_mut(contact)?.get_mut(step)? = sample;
        Some(())
    }

    /// Sample of one contact point at one step.
    #[must_use]
    pub fn get(&self, contact: usize, step: usize) -> Option<&ContactPointSample> {
        self.samples.get(contact)?.get(step)
    }

    /// All samples of one contact point.
    #[must_use]
    pub fn series(&self, contact: usize) -> Option<&[ContactPointSample]> {
        self.samples.get(contact).map(Vec::as_slice)
    }

    /// Samples of every contact point at one step, in contact index order.
    pub fn at_step(&self, step: usize) -> impl Iterator<Item = &ContactPointSample> + '_ {
        self.samples.iter().filter_map(move |series| series.get(step))
    }

    /// Number of contact points active at a step.
    #[must_use]
    pub fn active_count(&self, step: usize) -> usize {
        self.at_step(step).filter(|s| s.active).count()
    }
}
