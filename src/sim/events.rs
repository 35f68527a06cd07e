//! Injected callback seams
//!
//! The sim never talks to audio, HUD or match flow directly. Systems that
//! have something to report take an `&mut dyn EventSink`; the external layer
//! decides whether to play a sound, queue UI text, or drop the event. All
//! callbacks are synchronous and fire inside the tick that caused them.

use glam::Vec2;

use super::pickups::PickupKind;
use super::state::UnitId;

/// Feedback hooks the embedding layer may implement. Default impls are
/// no-ops so tests and headless runs can implement only what they observe.
pub trait EventSink {
    /// A unit took a non-lethal hit
    fn sfx_hit(&mut self, _pos: Vec2) {}
    /// An obstacle cell was hit; `destroyed` marks the breaking hit
    fn sfx_obstacle_hit(&mut self, _pos: Vec2, _destroyed: bool) {}
    fn sfx_explosion(&mut self, _pos: Vec2) {}
    fn sfx_pickup(&mut self, _pos: Vec2, _kind: PickupKind) {}
    /// The local player died
    fn sfx_player_death(&mut self) {}
    /// The local player got a kill
    fn sfx_player_kill(&mut self) {}
    /// Any other unit died
    fn sfx_generic_death(&mut self, _pos: Vec2) {}

    /// Damage number popup, already scaled to the final applied amount
    fn damage_popup(&mut self, _pos: Vec2, _amount: f32, _lethal: bool) {}
    /// HUD status line (reload prompts, pickup notices)
    fn status_text(&mut self, _text: &str) {}
    /// A dead unit wants to respawn after `delay_ticks`
    fn respawn_requested(&mut self, _unit: UnitId, _delay_ticks: u32) {}
}

/// Sink that swallows everything
pub struct NullSink;

impl EventSink for NullSink {}
