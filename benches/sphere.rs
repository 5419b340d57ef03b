use criterion::{criterion_group, criterion_main, BenchmarkId, Bencher, Criterion};
use druck::{Interpolator, Mesh, RenderResult, Shader, Surface, Varying, Varyings};
use std::time::Duration;
use vek::*;

struct Sphere {
    mvp: Mat4<f32>,
    light_dir: Vec3<f32>,
}

struct Normal(Vec3<f32>);

impl Varyings for Normal {
    fn varying(&self, name: &str) -> Option<Varying> {
        match name {
            "normal" => Some(self.0.into()),
            _ => None,
        }
    }
}

impl Shader<Vec3<f32>> for Sphere {
    type VsOut = Normal;

    #[inline(always)]
    fn vertex(&self, pos: &Vec3<f32>) -> (Vec4<f32>, Normal) {
        // Points on a unit sphere are their own normals
        (self.mvp * Vec4::from_point(*pos), Normal(*pos))
    }

    #[inline(always)]
    fn fragment(&self, v: &Interpolator<'_, Normal>) -> RenderResult<Rgba<f32>> {
        let norm: Vec3<f32> = v.interpolate("normal")?;
        let light = 0.2 + norm.normalized().dot(self.light_dir).max(0.0) * 0.8;
        Ok((Rgba::new(1.0, 0.7, 0.1, 1.0) * light).clamped(Rgba::zero(), Rgba::one()))
    }
}

fn uv_sphere(rings: u32, segments: u32) -> Mesh<Vec3<f32>> {
    let mut mesh = Mesh::with_capacity(((rings + 1) * (segments + 1)) as usize, (rings * segments * 2) as usize);
    for ring in 0..=rings {
        let theta = ring as f32 / rings as f32 * std::f32::consts::PI;
        for seg in 0..=segments {
            let phi = seg as f32 / segments as f32 * std::f32::consts::TAU;
            mesh.add_vertex(Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()));
        }
    }
    let stride = segments + 1;
    for ring in 0..rings {
        for seg in 0..segments {
            let (a, b) = (ring * stride + seg, (ring + 1) * stride + seg);
            mesh.add_element(a, b, a + 1);
            mesh.add_element(a + 1, b, b + 1);
        }
    }
    mesh
}

fn sphere_benchmark(b: &mut Bencher, &[width, height]: &[usize; 2]) {
    let mut surface = Surface::new(width, height).unwrap();
    let mesh = uv_sphere(32, 64);

    let mvp = Mat4::perspective_rh_no(1.3, (width as f32) / (height as f32), 0.01, 100.0)
        * Mat4::<f32>::translation_3d(Vec3::new(0.0, 0.0, -3.0))
        * Mat4::rotation_x(0.002f32.sin() * 8.0)
        * Mat4::rotation_y(0.004f32.cos() * 4.0);

    let shader = Sphere {
        mvp,
        light_dir: Vec3::new(1.0, 1.0, 1.0).normalized(),
    };

    b.iter(|| {
        surface.clear();
        surface.draw_mesh(&mesh, &shader).unwrap()
    });
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("sphere");
    for size in [[32, 32], [200, 200]] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", size[0], size[1])), &size, sphere_benchmark);
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .warm_up_time(Duration::from_millis(1000));
    targets = criterion_benchmark
}

criterion_main!(benches);
