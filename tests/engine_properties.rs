//! Behavioural properties of the engine, checked over pseudo-random inputs.

use image::Rgba;

use texpaint::canvas::PixelBuffer;
use texpaint::components::layers::LayerStack;
use texpaint::compositor::composite;
use texpaint::error::EngineError;
use texpaint::ops::fill::{flood_fill, select_similar};

/// Small xorshift generator so every run sees the same "random" data.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: u32) -> u32 {
        (self.next() % n as u64) as u32
    }

    fn color(&mut self) -> Rgba<u8> {
        let v = self.next().to_le_bytes();
        Rgba([v[0], v[1], v[2], v[3]])
    }
}

/// Buffer whose pixels are drawn from a small palette so regions form.
fn noisy_buffer(rng: &mut XorShift, w: u32, h: u32, palette: &[Rgba<u8>]) -> PixelBuffer {
    let mut buf = PixelBuffer::new(w, h).unwrap();
    for y in 0..h {
        for x in 0..w {
            let c = palette[rng.below(palette.len() as u32) as usize];
            buf.set(x, y, c).unwrap();
        }
    }
    buf
}

/// Reference 4-connected component by breadth-first search.
fn reference_component(buf: &PixelBuffer, seed: (u32, u32), same: impl Fn(Rgba<u8>) -> bool) -> Vec<(u32, u32)> {
    let (w, h) = buf.dimensions();
    let mut seen = vec![false; (w * h) as usize];
    let mut queue = std::collections::VecDeque::from([seed]);
    seen[(seed.1 * w + seed.0) as usize] = true;
    let mut out = Vec::new();
    while let Some((x, y)) = queue.pop_front() {
        out.push((x, y));
        let mut visit = |nx: u32, ny: u32| {
            let i = (ny * w + nx) as usize;
            if !seen[i] && same(buf.get(nx, ny).unwrap()) {
                seen[i] = true;
                queue.push_back((nx, ny));
            }
        };
        if x > 0 {
            visit(x - 1, y);
        }
        if x + 1 < w {
            visit(x + 1, y);
        }
        if y > 0 {
            visit(x, y - 1);
        }
        if y + 1 < h {
            visit(x, y + 1);
        }
    }
    out.sort_by_key(|&(x, y)| (y, x));
    out
}

#[test]
fn set_then_get_returns_the_color() {
    let mut rng = XorShift(0x1234_5678);
    for _ in 0..20 {
        let (w, h) = (rng.below(40) + 1, rng.below(40) + 1);
        let mut buf = PixelBuffer::new(w, h).unwrap();
        for _ in 0..50 {
            let (x, y, c) = (rng.below(w), rng.below(h), rng.color());
            buf.set(x, y, c).unwrap();
            assert_eq!(buf.get(x, y).unwrap(), c);
        }
        assert!(matches!(buf.get(w, 0), Err(EngineError::OutOfBounds { .. })));
        assert!(matches!(buf.set(0, h, rng.color()), Err(EngineError::OutOfBounds { .. })));
    }
}

#[test]
fn flood_fill_with_target_color_is_a_no_op() {
    let mut rng = XorShift(99);
    let palette = [Rgba([255, 0, 0, 255]), Rgba([0, 255, 0, 255]), Rgba([0, 0, 0, 0])];
    for _ in 0..10 {
        let mut buf = noisy_buffer(&mut rng, 30, 20, &palette);
        let before = buf.clone();
        let seed = (rng.below(30), rng.below(20));
        let target = buf.get(seed.0, seed.1).unwrap();
        let outcome = flood_fill(&mut buf, seed, target).unwrap();
        assert_eq!(outcome.filled, 0);
        assert_eq!(buf.as_raw(), before.as_raw());
    }
}

#[test]
fn flood_fill_on_uniform_buffer_recolors_everything() {
    let mut rng = XorShift(7);
    for _ in 0..10 {
        let (w, h) = (rng.below(64) + 1, rng.below(64) + 1);
        let mut buf = PixelBuffer::filled(w, h, Rgba([10, 20, 30, 40])).unwrap();
        let fill = Rgba([200, 100, 50, 255]);
        let outcome = flood_fill(&mut buf, (rng.below(w), rng.below(h)), fill).unwrap();
        assert_eq!(outcome.filled, w as u64 * h as u64);
        assert!(buf.as_image().pixels().all(|p| *p == fill));
    }
}

#[test]
fn flood_fill_matches_reference_component() {
    let mut rng = XorShift(0xdead_beef);
    let palette = [Rgba([255, 255, 255, 255]), Rgba([0, 0, 0, 255])];
    for _ in 0..10 {
        let buf = noisy_buffer(&mut rng, 25, 25, &palette);
        let seed = (rng.below(25), rng.below(25));
        let target = buf.get(seed.0, seed.1).unwrap();
        let expected = reference_component(&buf, seed, |c| c == target);

        let mut filled = buf.clone();
        let fill = Rgba([1, 2, 3, 4]);
        let outcome = flood_fill(&mut filled, seed, fill).unwrap();
        assert_eq!(outcome.filled as usize, expected.len());
        for &(x, y) in &expected {
            assert_eq!(filled.get(x, y).unwrap(), fill);
        }
        let changed = filled.as_image().pixels().filter(|p| **p == fill).count();
        assert_eq!(changed, expected.len());
    }
}

#[test]
fn zero_tolerance_selects_identical_component() {
    let mut rng = XorShift(31337);
    let palette = [Rgba([50, 50, 50, 255]), Rgba([51, 50, 50, 255]), Rgba([50, 50, 50, 254])];
    for _ in 0..10 {
        let buf = noisy_buffer(&mut rng, 20, 30, &palette);
        let seed = (rng.below(20), rng.below(30));
        let target = buf.get(seed.0, seed.1).unwrap();
        let sel = select_similar(&buf, seed, 0).unwrap();
        assert_eq!(sel.pixels(), reference_component(&buf, seed, |c| c == target));
        assert_eq!(sel.target(), target);
    }
}

#[test]
fn full_tolerance_selects_whole_canvas() {
    let mut rng = XorShift(4242);
    for _ in 0..5 {
        let (w, h) = (rng.below(30) + 1, rng.below(30) + 1);
        let mut buf = PixelBuffer::new(w, h).unwrap();
        for y in 0..h {
            for x in 0..w {
                buf.set(x, y, rng.color()).unwrap();
            }
        }
        let sel = select_similar(&buf, (rng.below(w), rng.below(h)), 255).unwrap();
        assert_eq!(sel.len() as u64, w as u64 * h as u64);
        assert_eq!(sel.bounds().area(), w as u64 * h as u64);
    }
}

#[test]
fn stack_invariants_hold_under_random_edits() {
    let mut rng = XorShift(0x0bad_cafe);
    let mut stack = LayerStack::new(8, 8).unwrap();
    for _ in 0..500 {
        let len = stack.len() as u32;
        match rng.below(6) {
            0 => {
                stack.add_layer(None);
            }
            1 => {
                let before = stack.len();
                match stack.remove_active() {
                    Ok(_) => assert_eq!(stack.len(), before - 1),
                    Err(EngineError::CannotRemoveLastLayer) => assert_eq!(before, 1),
                    Err(e) => panic!("unexpected error {e}"),
                }
            }
            2 => {
                let active = stack.active().id();
                let (from, to) = (rng.below(len) as usize, rng.below(len) as usize);
                stack.move_layer(from, to).unwrap();
                assert_eq!(stack.active().id(), active);
            }
            3 => stack.set_active(rng.below(len) as usize).unwrap(),
            4 => {
                stack.duplicate_active();
            }
            _ => {
                let _ = stack.remove(rng.below(len + 1) as usize);
            }
        }
        assert!(stack.len() >= 1);
        assert!(stack.active_index() < stack.len());
    }
}

#[test]
fn removing_the_only_layer_leaves_stack_unchanged() {
    let mut stack = LayerStack::new(3, 3).unwrap();
    stack.active_buffer_mut().fill(Rgba([9, 9, 9, 9]));
    let id = stack.active().id();
    assert!(matches!(stack.remove_active(), Err(EngineError::CannotRemoveLastLayer)));
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.active_index(), 0);
    assert_eq!(stack.active().id(), id);
    assert_eq!(stack.active_pixel(1, 1).unwrap(), Rgba([9, 9, 9, 9]));
}

#[test]
fn compositing_random_single_opaque_layer_is_identity() {
    let mut rng = XorShift(5);
    let mut stack = LayerStack::new(33, 17).unwrap();
    let mut buf = stack.active_buffer_mut();
    for y in 0..17 {
        for x in 0..33 {
            let mut c = rng.color();
            c[3] = 255;
            buf.set(x, y, c).unwrap();
        }
    }
    assert_eq!(&composite(&stack).unwrap(), stack.active().buffer());
}

#[test]
fn transparent_top_layer_is_invisible() {
    let mut rng = XorShift(11);
    let mut stack = LayerStack::new(12, 12).unwrap();
    let palette = [Rgba([10, 200, 30, 128]), Rgba([0, 0, 0, 0]), Rgba([255, 255, 255, 255])];
    stack.active_buffer_mut().replace(noisy_buffer(&mut rng, 12, 12, &palette)).unwrap();
    let base = composite(&stack).unwrap();

    stack.add_layer(Some("ghost"));
    stack.active_buffer_mut().replace(noisy_buffer(&mut rng, 12, 12, &palette)).unwrap();
    stack.set_opacity(1, 0.0).unwrap();
    assert_eq!(composite(&stack).unwrap(), base);
}
