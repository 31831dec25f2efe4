//! JS-facing handle. Thin wrappers that convert host values and forward to
//! [`AvatarSession`]; no logic lives here.

use wasm_bindgen::prelude::*;

use crate::camera::Aabb;
use crate::config::PuppetConfig;
use crate::landmark::{Landmark, landmarks_from_flat};
use crate::skeleton::SkeletonDesc;
use crate::state::AvatarSession;

fn init_logging() {
    // Set up panic hook for better error messages in browser console
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
}

#[wasm_bindgen]
pub struct AvatarPuppet {
    pub(crate) session: AvatarSession,
}

#[wasm_bindgen]
impl AvatarPuppet {
    /// Create a puppet from an optional JSON config; missing fields use defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<AvatarPuppet, JsValue> {
        init_logging();

        let config = match config_json {
            Some(json) => PuppetConfig::from_json(&json)?,
            None => PuppetConfig::default(),
        };
        Ok(AvatarPuppet {
            session: AvatarSession::new(config)?,
        })
    }

    /// Hand over the loaded model's node list and its bounding box
    /// (`{ min: [x, y, z], max: [x, y, z] }`).
    pub fn load_avatar(&mut self, skeleton: JsValue, bounds: JsValue) -> Result<(), JsValue> {
        let parsed = serde_wasm_bindgen::from_value::<SkeletonDesc>(skeleton).and_then(|desc| {
            serde_wasm_bindgen::from_value::<Aabb>(bounds).map(|bounds| (desc, bounds))
        });
        let (desc, bounds) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                self.session.fail_avatar_load(&err.to_string());
                return Err(err.into());
            }
        };
        self.session.load_avatar(desc, bounds)?;
        Ok(())
    }

    /// The host's loader rejected the asset.
    pub fn avatar_load_failed(&mut self, reason: Option<String>) {
        self.session.fail_avatar_load(reason.as_deref().unwrap_or("unknown error"));
    }

    /// Face-mesh callback with `multiFaceLandmarks` (array of faces, each an
    /// array of `{ x, y, z }`). Returns whether an estimate was published.
    pub fn on_face_results(&mut self, faces: JsValue) -> Result<bool, JsValue> {
        if faces.is_undefined() || faces.is_null() {
            return Ok(false);
        }
        let faces: Vec<Vec<Landmark>> = serde_wasm_bindgen::from_value(faces)?;
        Ok(self.session.on_face_results(&faces).is_some())
    }

    /// Single face as a flat `[x0, y0, z0, x1, ...]` buffer; empty means no face.
    pub fn on_face_landmarks(&mut self, flat: &[f32]) -> Result<bool, JsValue> {
        if flat.is_empty() {
            return Ok(false);
        }
        let points = landmarks_from_flat(flat)?;
        Ok(self.session.on_face_results(&[points]).is_some())
    }

    /// Advance to `time_seconds` and return the pose snapshot, or null before load.
    pub fn tick(&mut self, time_seconds: f32) -> Result<JsValue, JsValue> {
        match self.session.tick(time_seconds) {
            Some(snapshot) => Ok(serde_wasm_bindgen::to_value(&snapshot)?),
            None => Ok(JsValue::NULL),
        }
    }

    /// [`tick`](Self::tick) driven by `performance.now()`.
    pub fn tick_now(&mut self) -> Result<JsValue, JsValue> {
        let now_ms = web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .ok_or_else(|| JsValue::from_str("performance.now() unavailable"))?;
        self.tick((now_ms / 1000.0) as f32)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.session.resize(width, height);
    }

    /// Start button pressed; false means ignore the press.
    pub fn begin_start(&mut self) -> bool {
        self.session.begin_start()
    }

    pub fn camera_started(&mut self) {
        self.session.camera_started();
    }

    pub fn camera_failed(&mut self, message: Option<String>) {
        self.session.camera_failed(message.as_deref().unwrap_or_default());
    }

    pub fn stop_tracking(&mut self) {
        self.session.stop_tracking();
    }

    pub fn recalibrate(&mut self) {
        self.session.recalibrate();
    }

    pub fn dismiss_instructions(&mut self) {
        self.session.dismiss_instructions();
    }

    pub fn instructions_visible(&self) -> bool {
        self.session.instructions().is_visible()
    }

    pub fn status_text(&self) -> String {
        self.session.status().to_string()
    }

    /// Whether the status line reports a failure and should be styled as one.
    pub fn status_is_error(&self) -> bool {
        self.session.status().is_error()
    }

    pub fn start_enabled(&self) -> bool {
        self.session.start_control().is_enabled()
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_tracking()
    }

    /// An estimate is waiting for the next tick.
    pub fn has_pending_estimate(&self) -> bool {
        self.session.slot().peek().is_some()
    }

    pub fn head_found(&self) -> bool {
        self.session.rig().is_some_and(|rig| rig.head().is_some())
    }
}
