pub mod high_pass;
pub mod kalman;
pub mod motion;

pub use high_pass::high_pass_velocity;
pub use kalman::{KalmanSnapshot, OrientationKalman};
pub use motion::{body_to_world, integrate_step, world_acceleration};
