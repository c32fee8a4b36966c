use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use oddball_core::{Color, Scene, StimulusType};
use oddball_render::SkiaRenderer;
use oddball_timing::HighPrecisionTimer;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn harness() -> (SkiaRenderer, Vec<u8>, HighPrecisionTimer) {
    let r = SkiaRenderer::new(WIDTH, HEIGHT, None).expect("canvas");
    let fb = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    (r, fb, HighPrecisionTimer::new())
}

fn scenes() -> Vec<(&'static str, Scene)> {
    let cross = StimulusType::FixationCross {
        size: 40.0,
        color: Color::BLACK,
    };
    vec![
        ("fixation", Scene::centered(Color::GREY, cross.clone())),
        (
            "ball",
            Scene::centered(Color::GREY, cross.clone()).with(
                StimulusType::Ball {
                    radius: 30.0,
                    color: Color::PURPLE,
                },
                (0.0, 0.0),
            ),
        ),
        (
            "redirect",
            Scene::centered(Color::GREY, cross).with(
                StimulusType::GazeRedirect {
                    arrow_size: 40.0,
                    arrow_distance: 5.0,
                    frame_size: 240.0,
                    color: Color::RED,
                },
                (0.0, 0.0),
            ),
        ),
    ]
}

pub fn bench_scenes(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    for (name, scene) in scenes() {
        g.bench_function(name, |b| {
            b.iter_batched(
                harness,
                |(mut r, mut fb, mut t)| {
                    let stats = r.render_frame(&scene, &mut fb, &mut t);
                    black_box(stats.is_ok());
                },
                BatchSize::LargeInput,
            )
        });
    }

    g.finish();
}

criterion_group!(benches, bench_scenes);
criterion_main!(benches);
