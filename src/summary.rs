use serde::{Deserialize, Serialize};

use crate::joints::JointAngles;

/// Running count / min / max / mean over the valid readings of one angle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AngleSummary {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    #[serde(skip)]
    sum: f64,
}

impl AngleSummary {
    /// Unavailable and non-finite readings are not counted.
    pub fn push(&mut self, angle: Option<f64>) {
        let Some(angle) = angle.filter(|a| a.is_finite()) else {
            return;
        };
        self.count += 1;
        self.sum += angle;
        self.min = Some(self.min.map_or(angle, |m| m.min(angle)));
        self.max = Some(self.max.map_or(angle, |m| m.max(angle)));
        self.mean = Some(self.sum / self.count as f64);
    }

    pub fn range(&self) -> Option<f64> {
        Some(self.max? - self.min?)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JointSummary {
    pub left_knee: AngleSummary,
    pub right_knee: AngleSummary,
    pub left_hip: AngleSummary,
    pub right_hip: AngleSummary,
}

impl JointSummary {
    pub fn push(&mut self, angles: &JointAngles) {
        self.left_knee.push(angles.left_knee);
        self.right_knee.push(angles.right_knee);
        self.left_hip.push(angles.left_hip);
        self.right_hip.push(angles.right_hip);
    }

    pub fn from_angles<'a>(angles: impl IntoIterator<Item = &'a JointAngles>) -> Self {
        let mut summary = Self::default();
        for a in angles {
            summary.push(a);
        }
        summary
    }
}
