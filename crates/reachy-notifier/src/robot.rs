//! Motion collaborators and the gesture tables they play.
//!
//! Gestures are keyframe lists of joint goal positions (degrees) with a hold
//! time after each frame. `ReachyClient` sends them to the robot daemon's HTTP
//! bridge; `DemoMotion` only logs them.

use async_trait::async_trait;
use serde::Serialize;
use shared_types::Tier;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::collaborators::MotionController;
use crate::error::{NotifierError, NotifierResult};

/// One pose: joint goal positions plus how long to hold before the next frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub goals: Vec<(&'static str, f64)>,
    pub hold: Duration,
}

impl Keyframe {
    fn new(goals: &[(&'static str, f64)], hold_ms: u64) -> Self {
        Self {
            goals: goals.to_vec(),
            hold: Duration::from_millis(hold_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub name: &'static str,
    /// Parts powered on for the gesture and off again afterwards
    pub parts: Vec<&'static str>,
    pub frames: Vec<Keyframe>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Play(Gesture),
    Pause(Duration),
}

/// Right-arm wave: raise, three roll swings, back to rest.
pub fn wave() -> Gesture {
    let mut frames = vec![Keyframe::new(
        &[("r_arm.shoulder.pitch", -20.0), ("r_arm.elbow.pitch", -80.0)],
        1000,
    )];
    for _ in 0..3 {
        frames.push(Keyframe::new(&[("r_arm.shoulder.roll", -30.0)], 300));
        frames.push(Keyframe::new(&[("r_arm.shoulder.roll", 0.0)], 300));
    }
    frames.push(Keyframe::new(
        &[("r_arm.shoulder.pitch", 0.0), ("r_arm.elbow.pitch", 0.0)],
        1000,
    ));

    Gesture {
        name: "wave",
        parts: vec!["r_arm"],
        frames,
    }
}

pub fn head_nod() -> Gesture {
    let mut frames = Vec::new();
    for _ in 0..2 {
        frames.push(Keyframe::new(&[("head.neck.pitch", 20.0)], 400));
        frames.push(Keyframe::new(&[("head.neck.pitch", 0.0)], 400));
    }

    Gesture {
        name: "head_nod",
        parts: vec!["head"],
        frames,
    }
}

/// Alternate raising the left and right arm, twice.
pub fn happy_dance() -> Gesture {
    let mut frames = Vec::new();
    for _ in 0..2 {
        frames.push(Keyframe::new(
            &[("l_arm.shoulder.pitch", -40.0), ("r_arm.shoulder.pitch", 0.0)],
            500,
        ));
        frames.push(Keyframe::new(
            &[("l_arm.shoulder.pitch", 0.0), ("r_arm.shoulder.pitch", -40.0)],
            500,
        ));
    }
    frames.push(Keyframe::new(
        &[("l_arm.shoulder.pitch", 0.0), ("r_arm.shoulder.pitch", 0.0)],
        1000,
    ));

    Gesture {
        name: "happy_dance",
        parts: vec!["l_arm", "r_arm"],
        frames,
    }
}

/// Motion routine bound to each tier.
pub fn routine(tier: Tier) -> Vec<Step> {
    match tier {
        Tier::A => vec![Step::Play(wave())],
        Tier::B => vec![
            Step::Play(wave()),
            Step::Pause(Duration::from_millis(500)),
            Step::Play(head_nod()),
        ],
        Tier::C => vec![Step::Play(happy_dance())],
    }
}

#[derive(Debug, Serialize)]
struct GoalPositions {
    goals: BTreeMap<&'static str, f64>,
}

impl From<&Keyframe> for GoalPositions {
    fn from(frame: &Keyframe) -> Self {
        Self {
            goals: frame.goals.iter().copied().collect(),
        }
    }
}

/// HTTP client for the robot daemon.
///
/// Endpoints used:
/// - `GET  /api/daemon/status`: reachability probe
/// - `POST /api/motors/{part}/on` and `/off`: power a part
/// - `POST /api/motors/goal_positions`: `{"goals": {"<joint>": degrees}}`
pub struct ReachyClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReachyClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> NotifierResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::config(format!("Failed to build robot client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the daemon answers at all
    pub async fn ping(&self) -> bool {
        let url = format!("{}/api/daemon/status", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Robot daemon not reachable at {}: {}", self.base_url, e);
                false
            }
        }
    }

    async fn post(&self, path: &str, body: Option<&GoalPositions>) -> NotifierResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.post(&url);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| NotifierError::Motion(format!("{}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Motion(format!("{} returned {}", path, status)));
        }
        Ok(())
    }

    async fn set_power(&self, part: &str, on: bool) -> NotifierResult<()> {
        let state = if on { "on" } else { "off" };
        self.post(&format!("/api/motors/{}/{}", part, state), None)
            .await
    }

    async fn play(&self, gesture: &Gesture) -> NotifierResult<()> {
        tracing::info!("Reachy is performing {}", gesture.name);

        for part in &gesture.parts {
            self.set_power(part, true).await?;
        }

        let mut result = Ok(());
        for frame in &gesture.frames {
            if let Err(e) = self
                .post("/api/motors/goal_positions", Some(&GoalPositions::from(frame)))
                .await
            {
                result = Err(e);
                break;
            }
            tokio::time::sleep(frame.hold).await;
        }

        // Power down even when a frame failed
        for part in &gesture.parts {
            if let Err(e) = self.set_power(part, false).await {
                tracing::warn!("Failed to turn off {}: {}", part, e);
            }
        }

        result
    }
}

#[async_trait]
impl MotionController for ReachyClient {
    async fn perform_gesture(&self, tier: Tier) -> NotifierResult<()> {
        for step in routine(tier) {
            match step {
                Step::Play(gesture) => self.play(&gesture).await?,
                Step::Pause(duration) => tokio::time::sleep(duration).await,
            }
        }
        Ok(())
    }
}

/// Stand-in used when the robot is unavailable or demo mode is on.
pub struct DemoMotion;

#[async_trait]
impl MotionController for DemoMotion {
    async fn perform_gesture(&self, tier: Tier) -> NotifierResult<()> {
        for step in routine(tier) {
            if let Step::Play(gesture) = step {
                tracing::info!(
                    "[demo] Reachy would perform {} ({} frames)",
                    gesture.name,
                    gesture.frames.len()
                );
            }
        }
        Ok(())
    }
}
