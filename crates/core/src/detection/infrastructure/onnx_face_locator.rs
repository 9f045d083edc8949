//! YOLO face locator using ONNX Runtime via `ort`.
//!
//! Handles letterbox preprocessing, inference, NMS post-processing and the
//! mapping of boxes back into frame pixel space.
use std::path::Path;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Anchor score below which a model output row is not a detection.
///
/// Part of decoding the raw model output, not a user-facing filter.
const ANCHOR_SCORE_FLOOR: f32 = 0.25;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Face locator backed by an ONNX Runtime session.
pub struct OnnxFaceLocator {
    session: ort::session::Session,
    input_size: u32,
}

impl OnnxFaceLocator {
    /// Loads a YOLO face model.
    ///
    /// The input resolution is read from the model's input shape (NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path) -> Result<Self, BoxError> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_execution_providers(platform_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded face model {} (input {input_size}x{input_size})",
            model_path.display()
        );
        Ok(Self {
            session,
            input_size,
        })
    }
}

impl FaceLocator for OnnxFaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, BoxError> {
        let letterboxed = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(letterboxed.tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("face model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("unexpected face model output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("face model output is not contiguous")?;

        let mut candidates = decode_rows(data, shape[1], shape[2], &letterboxed);
        Ok(nms(&mut candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|c| c.to_bounding_box())
            .collect())
    }
}

/// Hardware providers tried before ONNX Runtime's CPU fallback.
fn platform_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

struct Letterboxed {
    tensor: ndarray::Array4<f32>,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

/// Letterbox-resizes a BGR frame into an RGB NCHW tensor of `target_size`².
fn letterbox(frame: &Frame, target_size: u32) -> Letterboxed {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding uses 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            // BGR -> RGB
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, 2 - c]] as f32 / 255.0;
            }
        }
    }

    Letterboxed {
        tensor,
        scale,
        pad_x,
        pad_y,
    }
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Candidate {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f32,
}

impl Candidate {
    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Rounds outward so the box never under-covers the face.
    fn to_bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.x1.floor() as i32,
            self.y1.floor() as i32,
            self.x2.ceil() as i32,
            self.y2.ceil() as i32,
        )
    }
}

/// Decodes `[cx, cy, w, h, score, ...]` rows from a `[1, a, b]` output.
///
/// YOLO exports either `[1, features, anchors]` or `[1, anchors, features]`;
/// the smaller axis is taken to be the feature axis.
fn decode_rows(data: &[f32], dim1: usize, dim2: usize, lb: &Letterboxed) -> Vec<Candidate> {
    let transposed = dim1 < dim2;
    let (num_anchors, num_feats) = if transposed { (dim2, dim1) } else { (dim1, dim2) };
    if num_feats < 5 {
        return Vec::new();
    }
    let at = |anchor: usize, feat: usize| {
        if transposed {
            data[feat * num_anchors + anchor]
        } else {
            data[anchor * num_feats + feat]
        }
    };

    let unmap_x = |v: f64| (v - lb.pad_x as f64) / lb.scale;
    let unmap_y = |v: f64| (v - lb.pad_y as f64) / lb.scale;

    (0..num_anchors)
        .filter(|&i| at(i, 4) >= ANCHOR_SCORE_FLOOR)
        .map(|i| {
            let cx = at(i, 0) as f64;
            let cy = at(i, 1) as f64;
            let w = at(i, 2) as f64;
            let h = at(i, 3) as f64;
            Candidate {
                x1: unmap_x(cx - w / 2.0),
                y1: unmap_y(cy - h / 2.0),
                x2: unmap_x(cx + w / 2.0),
                y2: unmap_y(cy + h / 2.0),
                score: at(i, 4),
            }
        })
        .collect()
}

/// Greedy NMS: sort by score descending, suppress overlapping boxes.
fn nms(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Candidate> = Vec::new();
    for c in candidates.iter() {
        if keep
            .iter()
            .all(|k| bbox_iou(&k.corners(), &c.corners()) <= iou_thresh)
        {
            keep.push(c.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
