//! Typed ffmpeg filter graphs for joining segments.
//!
//! Every input is first normalized (scale to fit, letterbox pad, square
//! pixels, common frame rate and pixel format), then joined either with a
//! single `concat` node or with a chain of `xfade` / `acrossfade` pairs.
//! The graph always exposes exactly one video and one audio output.

use std::fmt;

use serde::Serialize;

use hookreel_common::config::EncodingConfig;
use hookreel_common::error::{HookreelError, HookreelResult};

use crate::transition::TransitionPlan;

/// Label of the final video stream.
pub const VIDEO_OUT: &str = "vout";
/// Label of the final audio stream.
pub const AUDIO_OUT: &str = "aout";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

/// An edge of the graph: an input file's stream or a named intermediate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamRef {
    Input { index: usize, kind: StreamKind },
    Label(String),
}

impl StreamRef {
    pub fn video(index: usize) -> Self {
        Self::Input {
            index,
            kind: StreamKind::Video,
        }
    }

    pub fn audio(index: usize) -> Self {
        Self::Input {
            index,
            kind: StreamKind::Audio,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(name.into())
    }

    /// Form accepted by ffmpeg's `-map`.
    pub fn map_arg(&self) -> String {
        match self {
            StreamRef::Input { .. } => self.to_string(),
            StreamRef::Label(_) => format!("[{self}]"),
        }
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRef::Input {
                index,
                kind: StreamKind::Video,
            } => write!(f, "{index}:v"),
            StreamRef::Input {
                index,
                kind: StreamKind::Audio,
            } => write!(f, "{index}:a"),
            StreamRef::Label(name) => f.write_str(name),
        }
    }
}

/// Filter operations the assembler needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum Filter {
    /// Fit inside `width`x`height`, pad to exactly that size, force square
    /// pixels, then fix frame rate and pixel format.
    ScalePad {
        width: u32,
        height: u32,
        frame_rate: u32,
        pixel_format: String,
    },
    /// Concatenate `segments` interleaved video/audio pairs.
    Concat { segments: usize },
    /// Video cross-dissolve starting at `offset` on the first input's timeline.
    CrossDissolve { duration: f64, offset: f64 },
    /// Audio crossfade with triangular curves on both sides.
    AudioCrossfade { duration: f64 },
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::ScalePad {
                width,
                height,
                frame_rate,
                pixel_format,
            } => write!(
                f,
                "scale={width}:{height}:force_original_aspect_ratio=decrease,\
                 pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,\
                 fps={frame_rate},format={pixel_format}"
            ),
            Filter::Concat { segments } => write!(f, "concat=n={segments}:v=1:a=1"),
            Filter::CrossDissolve { duration, offset } => write!(
                f,
                "xfade=transition=fade:duration={duration:.3}:offset={offset:.3}"
            ),
            Filter::AudioCrossfade { duration } => {
                write!(f, "acrossfade=d={duration:.3}:c1=tri:c2=tri")
            }
        }
    }
}

/// One filter with its input and output pads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterNode {
    pub inputs: Vec<StreamRef>,
    pub filter: Filter,
    pub outputs: Vec<StreamRef>,
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{input}]")?;
        }
        write!(f, "{}", self.filter)?;
        for output in &self.outputs {
            write!(f, "[{output}]")?;
        }
        Ok(())
    }
}

/// A complete processing graph for one combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterGraph {
    pub nodes: Vec<FilterNode>,
    pub video_out: StreamRef,
    pub audio_out: StreamRef,
}

impl FilterGraph {
    /// Serialize to the `-filter_complex` argument.
    pub fn to_filter_complex(&self) -> String {
        self.nodes
            .iter()
            .map(|node| node.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// How normalized streams are joined.
#[derive(Debug, Clone, Copy)]
pub enum JoinMode<'a> {
    /// Hard cuts.
    Cut,
    /// Cross-dissolve at the plan's offsets.
    Blend(&'a TransitionPlan),
}

/// Builds [`FilterGraph`]s for a fixed output format.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    width: u32,
    height: u32,
    frame_rate: u32,
    pixel_format: String,
}

impl GraphBuilder {
    pub fn new(width: u32, height: u32, frame_rate: u32, pixel_format: impl Into<String>) -> Self {
        Self {
            width,
            height,
            frame_rate,
            pixel_format: pixel_format.into(),
        }
    }

    pub fn from_encoding(encoding: &EncodingConfig) -> Self {
        Self::new(
            encoding.frame_width,
            encoding.frame_height,
            encoding.frame_rate,
            encoding.pixel_format.clone(),
        )
    }

    /// Graph over `inputs` files, each carrying one video and one audio stream.
    pub fn build(&self, inputs: usize, join: JoinMode<'_>) -> HookreelResult<FilterGraph> {
        if inputs == 0 {
            return Err(HookreelError::graph("Cannot build a graph without inputs"));
        }

        let mut nodes: Vec<FilterNode> = (0..inputs)
            .map(|idx| FilterNode {
                inputs: vec![StreamRef::video(idx)],
                filter: Filter::ScalePad {
                    width: self.width,
                    height: self.height,
                    frame_rate: self.frame_rate,
                    pixel_format: self.pixel_format.clone(),
                },
                outputs: vec![normalized(idx)],
            })
            .collect();

        let (video_out, audio_out) = match join {
            JoinMode::Cut => {
                let pads = (0..inputs)
                    .flat_map(|idx| [normalized(idx), StreamRef::audio(idx)])
                    .collect();
                nodes.push(FilterNode {
                    inputs: pads,
                    filter: Filter::Concat { segments: inputs },
                    outputs: vec![StreamRef::label(VIDEO_OUT), StreamRef::label(AUDIO_OUT)],
                });
                (StreamRef::label(VIDEO_OUT), StreamRef::label(AUDIO_OUT))
            }
            JoinMode::Blend(plan) => {
                if plan.offsets.len() != inputs {
                    return Err(HookreelError::graph(format!(
                        "Transition plan has {} offsets for {inputs} inputs",
                        plan.offsets.len()
                    )));
                }
                self.chain_dissolves(&mut nodes, inputs, plan)
            }
        };

        Ok(FilterGraph {
            nodes,
            video_out,
            audio_out,
        })
    }

    fn chain_dissolves(
        &self,
        nodes: &mut Vec<FilterNode>,
        inputs: usize,
        plan: &TransitionPlan,
    ) -> (StreamRef, StreamRef) {
        let mut video = normalized(0);
        let mut audio = StreamRef::audio(0);

        for idx in 1..inputs {
            let last = idx == inputs - 1;
            let (video_next, audio_next) = if last {
                (StreamRef::label(VIDEO_OUT), StreamRef::label(AUDIO_OUT))
            } else {
                (
                    StreamRef::label(format!("x{idx}")),
                    StreamRef::label(format!("ax{idx}")),
                )
            };

            nodes.push(FilterNode {
                inputs: vec![video, normalized(idx)],
                filter: Filter::CrossDissolve {
                    duration: plan.transition_secs,
                    offset: plan.offsets[idx],
                },
                outputs: vec![video_next.clone()],
            });
            nodes.push(FilterNode {
                inputs: vec![audio, StreamRef::audio(idx)],
                filter: Filter::AudioCrossfade {
                    duration: plan.transition_secs,
                },
                outputs: vec![audio_next.clone()],
            });

            video = video_next;
            audio = audio_next;
        }

        (video, audio)
    }
}

fn normalized(idx: usize) -> StreamRef {
    StreamRef::label(format!("v{idx}"))
}
