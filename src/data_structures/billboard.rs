use std::rc::Rc;

use cgmath::Vector3;

use crate::data_structures::texture::Texture;

/// A textured quad that always faces the camera.
///
/// `position` is where the bottom centre of the quad stands. The quad is one
/// unit wide and one unit high before `scale_x`/`scale_y` are applied.
#[derive(Debug, Clone)]
pub struct Billboard {
    pub position: Vector3<f32>,
    pub scale_x: f32,
    pub scale_y: f32,
    pub texture: Rc<Texture>,
}

impl Billboard {
    pub fn new(position: Vector3<f32>, scale_x: f32, scale_y: f32, texture: Rc<Texture>) -> Self {
        Self {
            position,
            scale_x,
            scale_y,
            texture,
        }
    }
}
