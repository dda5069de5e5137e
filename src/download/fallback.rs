//! Bounded fallback resolution over (track, quality) attempts
//!
//! When a source is unavailable the pipeline walks an explicit attempt
//! loop instead of recursing: at most one track-level fallback onto the
//! alternate descriptor, then at most two steps down the quality ladder.
//! Both bounds are structural: the track flag only ever flips off and
//! the ladder only descends, so no cycle is reachable.

use crate::catalog::models::{Quality, TrackDescriptor};

/// Mutable state of the attempt loop.
#[derive(Debug, Clone)]
pub struct AttemptState {
    pub quality: Quality,
    /// May still switch to the alternate descriptor.
    pub allow_track_fallback: bool,
    /// May still step down the quality ladder.
    pub allow_quality_fallback: bool,
    /// A track-level fallback has been taken.
    pub is_fallback: bool,
    /// A quality step-down has been taken.
    pub is_quality_fallback: bool,
}

impl AttemptState {
    pub fn new(quality: Quality, allow_track_fallback: bool, allow_quality_fallback: bool) -> Self {
        Self {
            quality,
            allow_track_fallback,
            allow_quality_fallback,
            is_fallback: false,
            is_quality_fallback: false,
        }
    }
}

/// Next attempt chosen after an unavailable source.
#[derive(Debug)]
pub enum Decision {
    /// Retry with the alternate descriptor overlaid onto the original.
    RetryTrack {
        track: TrackDescriptor,
        state: AttemptState,
    },
    /// Retry the same track one quality rung down.
    RetryQuality { state: AttemptState },
    /// No attempt left; the track is skipped as unavailable.
    GiveUp,
}

/// Decide the next attempt after the resolver reported no usable source.
///
/// Geo-blocked and not-found arrive here alike: geo-blocking alone never
/// disqualifies the alternate. The track-level fallback requires an
/// alternate by the same artist and fires at most once; the quality
/// fallback steps down one rung, preserving any track-fallback state
/// already taken.
pub fn next_attempt(track: &TrackDescriptor, state: &AttemptState) -> Decision {
    if state.allow_track_fallback && !state.is_fallback {
        if let Some(alternate) = track.fallback.as_deref() {
            if alternate.artist_id == track.artist_id {
                let mut next = state.clone();
                next.allow_track_fallback = false;
                next.is_fallback = true;
                return Decision::RetryTrack {
                    track: track.overlay(alternate),
                    state: next,
                };
            }
        }
    }

    if state.allow_quality_fallback {
        if let Some(lower) = state.quality.step_down() {
            let mut next = state.clone();
            next.quality = lower;
            next.is_quality_fallback = true;
            return Decision::RetryQuality { state: next };
        }
    }

    Decision::GiveUp
}
