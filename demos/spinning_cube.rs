use druck::{Color, Interpolator, Mesh, RenderResult, Shader, Surface, Varying, Varyings};
use std::{error::Error, fs};
use vek::*;

struct Cube<'a> {
    mvp: Mat4<f32>,
    texture: &'a Surface,
}

struct VsOut {
    uv: Vec2<f32>,
    shade: f32,
}

impl Varyings for VsOut {
    fn varying(&self, name: &str) -> Option<Varying> {
        match name {
            "uv" => Some(self.uv.into()),
            "shade" => Some(self.shade.into()),
            _ => None,
        }
    }
}

impl<'a> Shader<(Vec3<f32>, Vec2<f32>, f32)> for Cube<'a> {
    type VsOut = VsOut;

    #[inline]
    fn vertex(&self, (pos, uv, shade): &(Vec3<f32>, Vec2<f32>, f32)) -> (Vec4<f32>, VsOut) {
        (
            self.mvp * Vec4::from_point(*pos),
            VsOut {
                uv: *uv,
                shade: *shade,
            },
        )
    }

    #[inline]
    fn fragment(&self, v: &Interpolator<'_, VsOut>) -> RenderResult<Rgba<f32>> {
        let texel = self.texture.sample(v.interpolate("uv")?);
        // Each face is lit uniformly
        let shade: f32 = v.flat("shade")?;
        Ok(Rgba::new(texel.r * shade, texel.g * shade, texel.b * shade, texel.a))
    }
}

fn checkerboard(size: usize, cells: usize) -> Result<Surface, Box<dyn Error>> {
    let mut texture = Surface::without_depth(size, size)?;
    let cell = (size / cells).max(1);
    for y in 0..size {
        for x in 0..size {
            let color = if (x / cell + y / cell) % 2 == 0 {
                Color::rgba(230, 120, 40, 255)
            } else {
                Color::rgba(40, 40, 60, 255)
            };
            texture.set_color_at(x as i32, y as i32, color);
        }
    }
    Ok(texture)
}

fn cube() -> Mesh<(Vec3<f32>, Vec2<f32>, f32)> {
    // Outward normal and two in-plane axes for each face
    let faces = [
        (Vec3::unit_z(), Vec3::unit_x(), Vec3::unit_y(), 1.0),
        (-Vec3::unit_z(), -Vec3::unit_x(), Vec3::unit_y(), 0.55),
        (Vec3::unit_x(), -Vec3::unit_z(), Vec3::unit_y(), 0.8),
        (-Vec3::unit_x(), Vec3::unit_z(), Vec3::unit_y(), 0.7),
        (Vec3::unit_y(), Vec3::unit_x(), -Vec3::unit_z(), 0.9),
        (-Vec3::unit_y(), Vec3::unit_x(), Vec3::unit_z(), 0.4),
    ];

    let mut mesh = Mesh::with_capacity(24, 12);
    for (normal, right, up, shade) in faces {
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)].map(|(u, v)| {
            let pos = normal + right * u + up * v;
            let uv = Vec2::new(u * 0.5 + 0.5, v * 0.5 + 0.5);
            mesh.add_vertex((pos, uv, shade))
        });
        mesh.add_element(corners[0], corners[1], corners[2]);
        mesh.add_element(corners[0], corners[2], corners[3]);
    }
    mesh
}

const W: usize = 800;
const H: usize = 600;
const FRAMES: usize = 8;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let texture = checkerboard(64, 8)?;
    let mesh = cube();
    let mut surface = Surface::new(W, H)?;

    let vp = Mat4::perspective_rh_no(1.3, W as f32 / H as f32, 0.01, 100.0)
        * Mat4::look_at_rh(Vec3::new(0.0, 2.0, 4.0), Vec3::zero(), Vec3::unit_y());

    fs::create_dir_all("demos/out")?;
    for i in 0..FRAMES {
        let mvp = vp * Mat4::rotation_y(i as f32 / FRAMES as f32 * std::f32::consts::FRAC_PI_2);

        surface.clear();
        let stats = surface.draw_mesh(
            &mesh,
            &Cube {
                mvp,
                texture: &texture,
            },
        )?;
        log::info!("frame {}: {} fragments", i, stats.fragments);

        surface.to_image().save(format!("demos/out/cube_{:02}.png", i))?;
    }
    Ok(())
}
