//! Bricker - a brick-breaking arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collisions, brick effects, game state)
//! - `platform`: Host-facing abstractions (assets, input)
//! - `settings`: Data-driven game configuration

pub mod platform;
pub mod settings;
pub mod sim;

pub use settings::{ConfigError, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Invisible wall thickness (left, top and right edges)
    pub const BORDER_WIDTH: f32 = 10.0;
    /// Closest a paddle may get to the screen edge
    pub const BUFFER_FROM_WALL: f32 = 11.0;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 100.0;
    pub const PADDLE_HEIGHT: f32 = 20.0;
    /// Distance of the main paddle's center above the bottom edge
    pub const PADDLE_Y_OFFSET: f32 = 65.0;
    /// Horizontal paddle speed (pixels/s)
    pub const PADDLE_SPEED: f32 = 350.0;

    /// Ball defaults
    pub const BALL_SIZE: f32 = 20.0;
    /// Per-axis ball speed (pixels/s); pucks share it
    pub const BALL_SPEED: f32 = 250.0;

    /// Brick grid layout
    pub const BRICK_HEIGHT: f32 = 15.0;
    pub const SPACE_BETWEEN_BRICKS: f32 = 3.0;
    pub const SPACE_BETWEEN_LINES: f32 = 20.0;
    pub const FIRST_BRICK_LINE_Y: f32 = 30.0;

    /// Pucks spawned by a single multi-ball split
    pub const NUM_OF_PUCKS: usize = 1;

    /// Falling pickup size and speed
    pub const PICKUP_WIDTH: f32 = 55.0;
    pub const PICKUP_HEIGHT: f32 = 30.0;
    pub const PICKUP_FALL_SPEED: f32 = 100.0;

    /// Time scale values
    pub const DEFAULT_TIME_SCALE: f32 = 1.0;
    pub const FAST_TIME_SCALE: f32 = 1.1;
    pub const SLOW_TIME_SCALE: f32 = 0.9;

    /// Camera frame relative to the window while focusing on the ball
    pub const CAMERA_FRAME_SCALE: f32 = 1.2;

    /// Asset paths handed to the host's asset provider
    pub mod assets {
        pub const BALL_IMAGE: &str = "assets/ball.png";
        pub const BALL_SOUND: &str = "assets/blop_cut_silenced.wav";
        pub const PADDLE_IMAGE: &str = "assets/paddle.png";
        pub const BRICK_IMAGE: &str = "assets/brick.png";
        pub const PUCK_IMAGE: &str = "assets/mockBall.png";
        pub const PUCK_SOUND: &str = "assets/Bubble5_4.wav";
        pub const SLOW_CLOCK_IMAGE: &str = "assets/slow.png";
        pub const FAST_CLOCK_IMAGE: &str = "assets/quicken.png";
    }
}

/// True if two time scales are the same setting
#[inline]
pub fn same_scale(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

/// Random diagonal velocity: each axis gets `speed` with an independent random sign
pub fn random_diagonal<R: rand::Rng + ?Sized>(rng: &mut R, speed: f32) -> Vec2 {
    let sx = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    let sy = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    Vec2::new(speed * sx, speed * sy)
}
