use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat4, Vec3};

pub const MIN_PAN_SPEED: f32 = 1.0;
pub const MAX_PAN_SPEED: f32 = 10.0;
pub const MIN_ROTATE_SPEED: f32 = 0.0005;
pub const MAX_ROTATE_SPEED: f32 = 0.01;

/// Number of `change_speed` steps needed to cross a speed range.
pub const SPEED_STEPS: f32 = 20.0;

const PAN_STEP: f32 = (MAX_PAN_SPEED - MIN_PAN_SPEED) / SPEED_STEPS;
const ROTATE_STEP: f32 = (MAX_ROTATE_SPEED - MIN_ROTATE_SPEED) / SPEED_STEPS;

pub const DEFAULT_FIELD_OF_VIEW: f32 = 45.0;

const DEGENERATE_AXIS: f32 = 1.0e-8;

/// Movement request for [`Camera::move_in`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraDirection {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    None,
}

/// Free-fly camera oriented by yaw and pitch.
///
/// The look, right and up axes are cached and re-derived after every
/// rotation so they stay orthonormal.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    look: Vec3,
    right: Vec3,
    up: Vec3,
    pan_speed: f32,
    rotate_speed: f32,
    field_of_view: f32,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            yaw: 1.5 * PI,
            pitch: 0.0,
            look: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            pan_speed: (MIN_PAN_SPEED + MAX_PAN_SPEED) / 2.0,
            rotate_speed: (MIN_ROTATE_SPEED + MAX_ROTATE_SPEED) / 2.0,
            field_of_view: DEFAULT_FIELD_OF_VIEW,
        };
        camera.update_axes();
        camera
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.position = Vec3::new(x, y, z);
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// Vertical field of view in degrees.
    pub fn set_field_of_view(&mut self, degrees: f32) {
        self.field_of_view = degrees;
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn look_direction(&self) -> Vec3 {
        self.look
    }

    pub fn right_axis(&self) -> Vec3 {
        self.right
    }

    pub fn up_axis(&self) -> Vec3 {
        self.up
    }

    pub fn pan_speed(&self) -> f32 {
        self.pan_speed
    }

    pub fn rotate_speed(&self) -> f32 {
        self.rotate_speed
    }

    /// Moves `pan_speed · frame_time` world units along one camera axis.
    pub fn move_in(&mut self, direction: CameraDirection, frame_time: f32) {
        let distance = self.pan_speed * frame_time;
        let offset = match direction {
            CameraDirection::Forward => self.look,
            CameraDirection::Back => -self.look,
            CameraDirection::Right => self.right,
            CameraDirection::Left => -self.right,
            CameraDirection::Up => self.up,
            CameraDirection::Down => -self.up,
            CameraDirection::None => return,
        };
        self.position += offset * distance;
    }

    /// Turns the camera by input deltas scaled with the rotate speed.
    ///
    /// Positive `dx` turns right, positive `dy` looks up.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.yaw += dx * self.rotate_speed;
        self.pitch = (self.pitch + dy * self.rotate_speed).clamp(-FRAC_PI_2, FRAC_PI_2);
        self.update_axes();
    }

    /// Steps both speeds by `scale` increments, each clamped to its range.
    pub fn change_speed(&mut self, scale: f32) {
        self.pan_speed = (self.pan_speed + PAN_STEP * scale).clamp(MIN_PAN_SPEED, MAX_PAN_SPEED);
        self.rotate_speed =
            (self.rotate_speed + ROTATE_STEP * scale).clamp(MIN_ROTATE_SPEED, MAX_ROTATE_SPEED);
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.look, Vec3::Y)
    }

    fn update_axes(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.look = Vec3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize();
        // looking straight up or down leaves the cross product degenerate
        let right = self.look.cross(Vec3::Y);
        self.right = if right.length_squared() > DEGENERATE_AXIS {
            right.normalize()
        } else {
            Vec3::new(-sin_yaw, 0.0, cos_yaw)
        };
        self.up = self.right.cross(self.look).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_orthonormal(camera: &Camera) {
        let (look, right, up) = (
            camera.look_direction(),
            camera.right_axis(),
            camera.up_axis(),
        );
        for axis in [look, right, up] {
            assert_abs_diff_eq!(axis.length(), 1.0, epsilon = 1e-4);
        }
        assert_abs_diff_eq!(look.dot(right), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(look.dot(up), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(right.dot(up), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn defaults_look_down_negative_z() {
        let camera = Camera::new();
        assert_eq!(camera.position(), Vec3::ZERO);
        assert_abs_diff_eq!(camera.look_direction().z, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(camera.right_axis().x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(camera.up_axis().y, 1.0, epsilon = 1e-6);
        assert_eq!(camera.field_of_view(), 45.0);
        assert_abs_diff_eq!(camera.pan_speed(), 5.5);
        assert_abs_diff_eq!(camera.rotate_speed(), 0.00525);
    }

    #[test]
    fn zero_rotation_does_not_drift() {
        let mut camera = Camera::new();
        let before = camera.look_direction();
        camera.rotate(0.0, 0.0);
        assert_eq!(camera.look_direction(), before);
    }

    #[test]
    fn pitch_stays_clamped_and_axes_orthonormal() {
        let mut camera = Camera::new();
        let deltas = [
            (120.0, 40.0),
            (-300.0, 900.0),
            (10.0, 5000.0),
            (0.0, -12000.0),
            (777.0, 123.0),
            (-1.0, -1.0),
        ];
        for (dx, dy) in deltas {
            camera.rotate(dx, dy);
            assert!(camera.pitch() <= FRAC_PI_2 && camera.pitch() >= -FRAC_PI_2);
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn looking_straight_up_keeps_a_right_axis() {
        let mut camera = Camera::new();
        camera.rotate(0.0, 1.0e6);
        assert_eq!(camera.pitch(), FRAC_PI_2);
        assert_orthonormal(&camera);
    }

    #[test]
    fn change_speed_saturates_at_both_ends() {
        let mut camera = Camera::new();
        for _ in 0..100 {
            camera.change_speed(1.0);
            assert!(camera.pan_speed() <= MAX_PAN_SPEED);
            assert!(camera.rotate_speed() <= MAX_ROTATE_SPEED);
        }
        assert_eq!(camera.pan_speed(), MAX_PAN_SPEED);
        assert_eq!(camera.rotate_speed(), MAX_ROTATE_SPEED);

        for _ in 0..100 {
            camera.change_speed(-1.0);
            assert!(camera.pan_speed() >= MIN_PAN_SPEED);
        }
        assert_eq!(camera.pan_speed(), MIN_PAN_SPEED);
        assert_eq!(camera.rotate_speed(), MIN_ROTATE_SPEED);
    }

    #[test]
    fn movement_scales_with_frame_time() {
        let mut camera = Camera::new();
        camera.move_in(CameraDirection::Forward, 0.0);
        assert_eq!(camera.position(), Vec3::ZERO);

        camera.move_in(CameraDirection::Forward, 0.1);
        let short = camera.position().length();
        camera.set_position(0.0, 0.0, 0.0);
        camera.move_in(CameraDirection::Forward, 0.2);
        let long = camera.position().length();
        assert_abs_diff_eq!(long, 2.0 * short, epsilon = 1e-5);
        assert_abs_diff_eq!(short, camera.pan_speed() * 0.1, epsilon = 1e-5);
    }

    #[test]
    fn directions_follow_camera_axes() {
        let mut camera = Camera::new();
        camera.move_in(CameraDirection::Right, 1.0);
        assert!(camera.position().x > 0.0);
        camera.set_position(0.0, 0.0, 0.0);
        camera.move_in(CameraDirection::Down, 1.0);
        assert!(camera.position().y < 0.0);
        camera.set_position(0.0, 0.0, 0.0);
        camera.move_in(CameraDirection::Back, 1.0);
        assert!(camera.position().z > 0.0);
        camera.set_position(1.0, 2.0, 3.0);
        camera.move_in(CameraDirection::None, 1.0);
        assert_eq!(camera.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn view_moves_world_opposite_to_camera() {
        let mut camera = Camera::new();
        camera.set_position(0.0, 0.0, 5.0);
        let origin = camera.view().transform_point3(Vec3::ZERO);
        assert_abs_diff_eq!(origin.z, -5.0, epsilon = 1e-5);
    }
}
