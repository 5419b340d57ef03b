use druck::{Interpolator, RenderResult, Shader, Surface, Varying, Varyings};
use std::{error::Error, fs};
use vek::*;

struct Triangle;

struct VsOut {
    color: Rgba<f32>,
}

impl Varyings for VsOut {
    fn varying(&self, name: &str) -> Option<Varying> {
        match name {
            "color" => Some(Vec4::from(self.color).into()),
            _ => None,
        }
    }
}

impl Shader<(Vec4<f32>, Rgba<f32>)> for Triangle {
    type VsOut = VsOut;

    // Vertex shader
    // - Returns the clip-space position, and the values to be interpolated for the fragment shader
    #[inline(always)]
    fn vertex(&self, (pos, color): &(Vec4<f32>, Rgba<f32>)) -> (Vec4<f32>, VsOut) {
        (*pos, VsOut { color: *color })
    }

    // Fragment shader
    #[inline(always)]
    fn fragment(&self, v: &Interpolator<'_, VsOut>) -> RenderResult<Rgba<f32>> {
        let color: Vec4<f32> = v.interpolate("color")?;
        Ok(Rgba::from(color))
    }
}

const W: usize = 640;
const H: usize = 480;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut surface = Surface::new(W, H)?;

    surface.draw_triangle(
        &(Vec4::new(-1.0, -1.0, 1.0, 1.0), Rgba::new(1.0, 0.0, 0.0, 1.0)),
        &(Vec4::new(1.0, -1.0, 1.0, 1.0), Rgba::new(0.0, 1.0, 0.0, 1.0)),
        &(Vec4::new(0.0, 1.0, 1.0, 1.0), Rgba::new(0.0, 0.0, 1.0, 1.0)),
        &Triangle,
    )?;

    fs::create_dir_all("demos/out")?;
    surface.to_image().save("demos/out/triangle.png")?;
    Ok(())
}
