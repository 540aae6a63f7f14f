//! Turntable camera feeding the matrix built-ins.

use glam::{Mat4, Vec3};

use shadevars_engine::{BuiltinMatrix, Registry};

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    /// Around +Y, radians.
    pub yaw: f32,
    /// From the +Y axis, radians.
    pub pitch: f32,
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            radius: 3.0,
            yaw: 0.0,
            pitch: std::f32::consts::FRAC_PI_2,
            fov: std::f32::consts::FRAC_PI_4,
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.target
            + Vec3::new(
                self.radius * self.pitch.sin() * self.yaw.sin(),
                self.radius * self.pitch.cos(),
                self.radius * self.pitch.sin() * self.yaw.cos(),
            )
    }

    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        self.yaw -= delta_x;
        self.pitch = (self.pitch - delta_y).clamp(0.01, std::f32::consts::PI - 0.01);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.radius = (self.radius - delta).max(0.1);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Push model/view/projection/mvp into the registry's built-ins.
    pub fn feed(&self, registry: &mut Registry) {
        let model = Mat4::IDENTITY;
        let view = self.view_matrix();
        let projection = self.projection_matrix();
        let mvp = projection * view * model;
        registry.set_matrix(BuiltinMatrix::Model, row_major(model));
        registry.set_matrix(BuiltinMatrix::View, row_major(view));
        registry.set_matrix(BuiltinMatrix::Projection, row_major(projection));
        registry.set_matrix(BuiltinMatrix::Mvp, row_major(mvp));
    }
}

/// glam stores columns; registry matrices are row-major.
fn row_major(m: Mat4) -> [f32; 16] {
    m.transpose().to_cols_array()
}
