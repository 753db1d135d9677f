// ============================================================================
// RENDERING
// ============================================================================
//
// Each frame is described as a list of draw commands (a `Scene`) and then
// replayed onto the RGBA frame buffer. Radar angles are degrees on the
// upper half plane: 0 points left of the center, 90 straight up, 180 right.

use rusttype::{point, Font, PositionedGlyph, Scale};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::RadarConfig;
use crate::detection::{ContactStatus, Detection};
use crate::error::{RadarError, Result};
use crate::sink::{Dashboard, EMPTY_LOG_PLACEHOLDER};

type Rgb = (u8, u8, u8);

const WHITE: Rgb = (0xff, 0xff, 0xff);
const ALERT_RED: Rgb = (0xff, 0x4d, 0x4d);
const CLOSE_AMBER: Rgb = (0xff, 0xb8, 0x00);

/// Places where a monospace font is commonly installed.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "C:\\Windows\\Fonts\\consola.ttf",
];

// ============================================================================
// CORE DATA TYPES
// ============================================================================

/// Rectangle of the frame a renderer may draw into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        // Never trust the caller's height beyond what the buffer holds.
        let height = if width == 0 {
            0
        } else {
            height.min(frame.len() / (width * 4))
        };
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Color at `(x, y)`, if inside the canvas.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            Some((self.frame[idx], self.frame[idx + 1], self.frame[idx + 2]))
        } else {
            None
        }
    }

    /// Alpha-blend one pixel. Anything off the canvas is ignored.
    fn blend(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        let src = [color.0 as f32, color.1 as f32, color.2 as f32];
        let dst = [
            self.frame[idx] as f32,
            self.frame[idx + 1] as f32,
            self.frame[idx + 2] as f32,
        ];
        let out = [
            (src[0] * a + dst[0] * (1.0 - a)).round() as u8,
            (src[1] * a + dst[1] * (1.0 - a)).round() as u8,
            (src[2] * a + dst[2] * (1.0 - a)).round() as u8,
            0xff,
        ];
        self.frame[idx..idx + 4].copy_from_slice(&out);
    }

    /// Pixel range `[lo, hi]` of a box, clipped to the canvas.
    fn clip(&self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Option<(i32, i32, i32, i32)> {
        if self.is_empty() {
            return None;
        }
        let x0 = (min_x.floor() as i32).max(0);
        let y0 = (min_y.floor() as i32).max(0);
        let x1 = (max_x.ceil() as i32).min(self.width as i32 - 1);
        let y1 = (max_y.ceil() as i32).min(self.height as i32 - 1);
        if x0 > x1 || y0 > y1 {
            None
        } else {
            Some((x0, x1, y0, y1))
        }
    }
}

/// Read-only snapshot of engine state handed to the renderer.
#[derive(Debug, Clone)]
pub struct RadarView<'a> {
    pub sweep_angle: f64,
    pub active: bool,
    pub max_range: f64,
    pub lifetime: Duration,
    pub beam_width: f64,
    /// `(angle, opacity)` per trail point.
    pub trail: Vec<(f64, f64)>,
    pub detections: Vec<&'a Detection>,
    pub now: Duration,
}

/// Center and radius of the scope inside a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopeGeometry {
    pub cx: f64,
    pub cy: f64,
    pub max_radius: f64,
}

impl ScopeGeometry {
    pub fn new(viewport: Viewport) -> Self {
        let half_width = viewport.width as f64 / 2.0;
        let baseline = viewport.height as f64 - 20.0;
        Self {
            cx: viewport.x as f64 + half_width,
            cy: viewport.y as f64 + baseline,
            max_radius: half_width.min(baseline - 20.0).max(0.0),
        }
    }

    /// Screen position of a polar coordinate.
    pub fn point(&self, angle: f64, radius: f64) -> (f64, f64) {
        polar_to_screen(self.cx, self.cy, angle, radius)
    }

    /// Screen position of a contact at `distance` on a scope of `max_range`.
    pub fn contact_point(&self, angle: f64, distance: f64, max_range: f64) -> (f64, f64) {
        self.point(angle, distance / max_range * self.max_radius)
    }
}

/// `x = cx + cos(π − θ)·r`, `y = cy − sin(π − θ)·r`, θ in degrees.
pub fn polar_to_screen(cx: f64, cy: f64, angle: f64, radius: f64) -> (f64, f64) {
    let theta = PI - angle.to_radians();
    (cx + theta.cos() * radius, cy - theta.sin() * radius)
}

/// Inverse of `polar_to_screen` for the angle: degrees in `(-180, 180]`.
fn radar_angle(cx: f64, cy: f64, x: f64, y: f64) -> f64 {
    (cy - y).atan2(cx - x).to_degrees()
}

// ============================================================================
// RETAINED MODE ABSTRACTIONS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Anchor {
    Center,
    Left,
}

#[derive(Clone, Debug)]
enum DrawCommand {
    Fill {
        viewport: Viewport,
        color: Rgb,
        alpha: f32,
    },
    Arc {
        cx: f64,
        cy: f64,
        r: f64,
        thickness: f64,
        from: f64,
        to: f64,
        color: Rgb,
        alpha: f32,
        glow: f64,
    },
    Line {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        thickness: f64,
        /// Fraction of the width lost by the far end.
        taper: f64,
        color: Rgb,
        stops: Vec<(f64, f64)>,
        glow: f64,
    },
    Ring {
        cx: f64,
        cy: f64,
        radius: f64,
        thickness: f64,
        color: Rgb,
        alpha: f32,
        glow: f64,
    },
    Disc {
        cx: f64,
        cy: f64,
        radius: f64,
        color: Rgb,
        stops: Vec<(f64, f64)>,
    },
    Wedge {
        cx: f64,
        cy: f64,
        radius: f64,
        from: f64,
        to: f64,
        color: Rgb,
        stops: Vec<(f64, f64)>,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        font_size: f32,
        color: Rgb,
        alpha: f32,
        anchor: Anchor,
        glow: bool,
    },
}

struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    fn render(&self, canvas: &mut Canvas, font: Option<&Font>) {
        for command in &self.commands {
            match command {
                DrawCommand::Fill {
                    viewport,
                    color,
                    alpha,
                } => fill_viewport(canvas, *viewport, *color, *alpha),
                DrawCommand::Arc {
                    cx,
                    cy,
                    r,
                    thickness,
                    from,
                    to,
                    color,
                    alpha,
                    glow,
                } => {
                    for (extra, scale) in glow_passes(*glow) {
                        stroke_arc(
                            canvas,
                            *cx,
                            *cy,
                            *r,
                            thickness + extra,
                            Some((*from, *to)),
                            *color,
                            alpha * scale,
                        );
                    }
                    stroke_arc(
                        canvas,
                        *cx,
                        *cy,
                        *r,
                        *thickness,
                        Some((*from, *to)),
                        *color,
                        *alpha,
                    );
                }
                DrawCommand::Line {
                    x0,
                    y0,
                    x1,
                    y1,
                    thickness,
                    taper,
                    color,
                    stops,
                    glow,
                } => {
                    for (extra, scale) in glow_passes(*glow) {
                        let halo: Vec<(f64, f64)> =
                            stops.iter().map(|(t, a)| (*t, a * scale as f64)).collect();
                        draw_gradient_line(
                            canvas,
                            *x0,
                            *y0,
                            *x1,
                            *y1,
                            thickness + extra,
                            *taper,
                            *color,
                            &halo,
                        );
                    }
                    draw_gradient_line(
                        canvas, *x0, *y0, *x1, *y1, *thickness, *taper, *color, stops,
                    );
                }
                DrawCommand::Ring {
                    cx,
                    cy,
                    radius,
                    thickness,
                    color,
                    alpha,
                    glow,
                } => {
                    for (extra, scale) in glow_passes(*glow) {
                        stroke_arc(
                            canvas,
                            *cx,
                            *cy,
                            *radius,
                            thickness + extra,
                            None,
                            *color,
                            alpha * scale,
                        );
                    }
                    stroke_arc(
                        canvas, *cx, *cy, *radius, *thickness, None, *color, *alpha,
                    );
                }
                DrawCommand::Disc {
                    cx,
                    cy,
                    radius,
                    color,
                    stops,
                } => fill_disc(canvas, *cx, *cy, *radius, *color, stops),
                DrawCommand::Wedge {
                    cx,
                    cy,
                    radius,
                    from,
                    to,
                    color,
                    stops,
                } => fill_wedge(canvas, *cx, *cy, *radius, *from, *to, *color, stops),
                DrawCommand::Text {
                    x,
                    y,
                    text,
                    font_size,
                    color,
                    alpha,
                    anchor,
                    glow,
                } => {
                    // Labels are decoration; without a font they are skipped.
                    let Some(font) = font else { continue };
                    let scale = Scale::uniform(*font_size);
                    if *glow {
                        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                            draw_text(
                                canvas,
                                x + dx,
                                y + dy,
                                text,
                                font,
                                scale,
                                *color,
                                alpha * 0.3,
                                *anchor,
                            );
                        }
                    }
                    draw_text(canvas, *x, *y, text, font, scale, *color, *alpha, *anchor);
                }
            }
        }
    }
}

// ============================================================================
// SCOPE RENDERING
// ============================================================================

/// Draw the scope for `view` into `viewport`. Holds no state of its own.
pub fn render_radar(
    canvas: &mut Canvas,
    viewport: Viewport,
    view: &RadarView,
    config: &RadarConfig,
    font: Option<&Font>,
) {
    if canvas.is_empty() || viewport.is_empty() {
        return;
    }
    let scene = build_radar_scene(viewport, view, config);
    scene.render(canvas, font);
}

fn build_radar_scene(viewport: Viewport, view: &RadarView, config: &RadarConfig) -> Scene {
    let mut scene = Scene::new();
    let background = config.background_color.as_tuple();
    let primary = config.primary_color.as_tuple();
    let secondary = config.secondary_color.as_tuple();
    let t = view.now.as_millis() as f64;

    scene.add_command(DrawCommand::Fill {
        viewport,
        color: background,
        alpha: 0.1,
    });
    scene.add_command(DrawCommand::Fill {
        viewport,
        color: background,
        alpha: 1.0,
    });

    let scope = ScopeGeometry::new(viewport);
    if scope.max_radius <= 0.0 {
        return scene;
    }

    add_grid(&mut scene, &scope, primary, t);

    if view.active {
        for &(angle, opacity) in &view.trail {
            let (x1, y1) = scope.point(angle, scope.max_radius);
            scene.add_command(DrawCommand::Line {
                x0: scope.cx,
                y0: scope.cy,
                x1,
                y1,
                thickness: 1.0,
                taper: 0.0,
                color: primary,
                stops: vec![(0.0, opacity * 0.3), (1.0, opacity * 0.05)],
                glow: 0.0,
            });
        }
    }

    for detection in &view.detections {
        add_contact(&mut scene, &scope, view, detection, primary, secondary, t);
    }

    if view.active {
        let (x1, y1) = scope.point(view.sweep_angle, scope.max_radius);
        scene.add_command(DrawCommand::Line {
            x0: scope.cx,
            y0: scope.cy,
            x1,
            y1,
            thickness: 3.0,
            taper: 0.5,
            color: primary,
            stops: vec![(0.0, 1.0), (0.3, 0.8), (0.7, 0.4), (1.0, 0.1)],
            glow: 6.0,
        });
        scene.add_command(DrawCommand::Wedge {
            cx: scope.cx,
            cy: scope.cy,
            radius: scope.max_radius,
            from: view.sweep_angle,
            to: view.sweep_angle + view.beam_width,
            color: primary,
            stops: vec![(0.0, 0.15), (0.5, 0.08), (1.0, 0.02)],
        });
    }

    add_labels(&mut scene, &scope, view.max_range, config, secondary);
    scene
}

fn add_grid(scene: &mut Scene, scope: &ScopeGeometry, color: Rgb, t: f64) {
    for i in 1..=4 {
        let r = scope.max_radius / 4.0 * i as f64;
        scene.add_command(DrawCommand::Arc {
            cx: scope.cx,
            cy: scope.cy,
            r,
            thickness: 1.0,
            from: 0.0,
            to: 180.0,
            color,
            alpha: 0.3 + i as f32 * 0.1,
            glow: 3.0,
        });
        if i == 4 {
            scene.add_command(DrawCommand::Arc {
                cx: scope.cx,
                cy: scope.cy,
                r,
                thickness: 2.0,
                from: 0.0,
                to: 180.0,
                color,
                alpha: (0.5 + (t * 0.005).sin() * 0.2) as f32,
                glow: 0.0,
            });
        }
    }

    for step in 0..6 {
        let angle = 15.0 + 30.0 * step as f64;
        let (x1, y1) = scope.point(angle, scope.max_radius);
        scene.add_command(DrawCommand::Line {
            x0: scope.cx,
            y0: scope.cy,
            x1,
            y1,
            thickness: 1.0,
            taper: 0.0,
            color,
            stops: vec![(0.0, 0.4), (1.0, 0.1)],
            glow: 1.5,
        });
    }

    scene.add_command(DrawCommand::Arc {
        cx: scope.cx,
        cy: scope.cy,
        r: scope.max_radius,
        thickness: 2.0,
        from: 0.0,
        to: 180.0,
        color,
        alpha: 1.0,
        glow: 4.0,
    });
}

fn add_contact(
    scene: &mut Scene,
    scope: &ScopeGeometry,
    view: &RadarView,
    detection: &Detection,
    primary: Rgb,
    secondary: Rgb,
    t: f64,
) {
    let alpha = detection.alpha(view.now, view.lifetime);
    let (x, y) = scope.contact_point(detection.angle, detection.distance, view.max_range);

    for ripple in &detection.ripples {
        scene.add_command(DrawCommand::Ring {
            cx: x,
            cy: y,
            radius: ripple.radius,
            thickness: 2.0,
            color: secondary,
            alpha: (ripple.opacity * 0.5) as f32,
            glow: 1.5,
        });
    }

    let pulse = 1.0 + (t * 0.01 + detection.id as f64).sin() * 0.3;
    let size = (4.0 + detection.intensity * 3.0) * pulse;

    scene.add_command(DrawCommand::Disc {
        cx: x,
        cy: y,
        radius: size * 2.0,
        color: primary,
        stops: vec![(0.0, alpha * 0.8), (1.0, 0.0)],
    });
    scene.add_command(DrawCommand::Disc {
        cx: x,
        cy: y,
        radius: size,
        color: primary,
        stops: vec![(0.0, alpha)],
    });
    scene.add_command(DrawCommand::Disc {
        cx: x,
        cy: y,
        radius: size * 0.4,
        color: WHITE,
        stops: vec![(0.0, alpha * 0.8)],
    });
}

fn add_labels(
    scene: &mut Scene,
    scope: &ScopeGeometry,
    max_range: f64,
    config: &RadarConfig,
    color: Rgb,
) {
    for i in 1..=4 {
        let radius = scope.max_radius / 4.0 * i as f64;
        let range = (max_range / 4.0 * i as f64).round() as i64;
        scene.add_command(DrawCommand::Text {
            x: scope.cx.round() as i32,
            y: (scope.cy - radius - 8.0).round() as i32,
            text: format!("{}cm", range),
            font_size: config.range_label_size,
            color,
            alpha: 1.0,
            anchor: Anchor::Center,
            glow: true,
        });
    }

    for angle in [30, 60, 90, 120, 150] {
        let (x, y) = scope.point(angle as f64, scope.max_radius + 20.0);
        scene.add_command(DrawCommand::Text {
            x: x.round() as i32,
            y: y.round() as i32 + 3,
            text: format!("{}°", angle),
            font_size: config.angle_label_size,
            color,
            alpha: 0.8,
            anchor: Anchor::Center,
            glow: true,
        });
    }
}

/// Progress arc and caption shown while the scope warms up.
pub fn render_startup_overlay(
    canvas: &mut Canvas,
    viewport: Viewport,
    progress: f64,
    config: &RadarConfig,
    font: Option<&Font>,
) {
    if canvas.is_empty() || viewport.is_empty() {
        return;
    }
    let scope = ScopeGeometry::new(viewport);
    let primary = config.primary_color.as_tuple();
    let mut scene = Scene::new();
    scene.add_command(DrawCommand::Fill {
        viewport,
        color: config.background_color.as_tuple(),
        alpha: 0.6,
    });
    scene.add_command(DrawCommand::Arc {
        cx: scope.cx,
        cy: scope.cy,
        r: scope.max_radius * 0.5,
        thickness: 3.0,
        from: 0.0,
        to: 180.0 * progress.clamp(0.0, 1.0),
        color: primary,
        alpha: 0.9,
        glow: 4.0,
    });
    scene.add_command(DrawCommand::Text {
        x: scope.cx.round() as i32,
        y: (scope.cy - scope.max_radius * 0.25).round() as i32,
        text: "INITIALIZING".to_string(),
        font_size: config.dashboard_font_size + 4.0,
        color: primary,
        alpha: 1.0,
        anchor: Anchor::Center,
        glow: true,
    });
    scene.render(canvas, font);
}

// ============================================================================
// DASHBOARD RENDERING
// ============================================================================

/// What the status line of the dashboard says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStatus {
    Standby,
    Initializing,
    Active,
}

impl PanelStatus {
    fn label(self) -> &'static str {
        match self {
            PanelStatus::Standby => "STANDBY",
            PanelStatus::Initializing => "INITIALIZING",
            PanelStatus::Active => "ACTIVE",
        }
    }
}

pub fn render_dashboard(
    canvas: &mut Canvas,
    viewport: Viewport,
    dashboard: &Dashboard,
    status: PanelStatus,
    max_range: f64,
    config: &RadarConfig,
    font: Option<&Font>,
) {
    if canvas.is_empty() || viewport.is_empty() {
        return;
    }
    let primary = config.primary_color.as_tuple();
    let secondary = config.secondary_color.as_tuple();
    let size = config.dashboard_font_size;
    let line = (size * 1.6).round() as i32;
    let left = viewport.x + 16;
    let mut y = viewport.y + line;
    let mut scene = Scene::new();

    scene.add_command(DrawCommand::Fill {
        viewport,
        color: config.background_color.as_tuple(),
        alpha: 1.0,
    });
    // Separator between scope and panel.
    scene.add_command(DrawCommand::Line {
        x0: viewport.x as f64,
        y0: viewport.y as f64,
        x1: viewport.x as f64,
        y1: (viewport.y + viewport.height as i32) as f64,
        thickness: 1.0,
        taper: 0.0,
        color: primary,
        stops: vec![(0.0, 0.5), (1.0, 0.1)],
        glow: 0.0,
    });

    let lamp = match status {
        PanelStatus::Active => (primary, 1.0),
        PanelStatus::Initializing => (CLOSE_AMBER, 1.0),
        PanelStatus::Standby => (primary, 0.25),
    };
    scene.add_command(DrawCommand::Disc {
        cx: (left + 5) as f64,
        cy: y as f64,
        radius: 5.0,
        color: lamp.0,
        stops: vec![(0.0, lamp.1)],
    });
    let text = |scene: &mut Scene, x: i32, y: i32, text: String, color: Rgb, alpha: f32| {
        scene.add_command(DrawCommand::Text {
            x,
            y,
            text,
            font_size: size,
            color,
            alpha,
            anchor: Anchor::Left,
            glow: false,
        });
    };
    text(&mut scene, left + 18, y, status.label().to_string(), lamp.0, 1.0);

    y += line * 3 / 2;
    let readouts = [
        ("DISTANCE", format!("{} cm", dashboard.distance.shown())),
        ("ANGLE", format!("{}°", dashboard.angle.shown())),
        ("OBJECTS", format!("{}", dashboard.object_count)),
        ("RANGE", format!("{} cm", max_range.round() as i64)),
    ];
    for (label, value) in readouts {
        text(&mut scene, left, y, label.to_string(), secondary, 0.8);
        text(&mut scene, left + 120, y, value, primary, 1.0);
        y += line;
    }

    y += line / 2;
    text(&mut scene, left, y, "RECENT DETECTIONS".to_string(), secondary, 1.0);
    y += line;
    let columns = [left, left + 80, left + 140, left + 210];
    for (x, header) in columns.iter().zip(["TIME", "ANGLE", "DIST", "STATUS"]) {
        text(&mut scene, *x, y, header.to_string(), secondary, 0.6);
    }
    y += line;

    if dashboard.log.is_empty() {
        text(&mut scene, left, y, EMPTY_LOG_PLACEHOLDER.to_string(), WHITE, 0.5);
    }
    for row in dashboard.log.rows() {
        let status_color = match row.status {
            ContactStatus::Alert => ALERT_RED,
            ContactStatus::Close => CLOSE_AMBER,
            ContactStatus::Normal => primary,
        };
        text(&mut scene, columns[0], y, row.time.clone(), WHITE, 0.8);
        text(&mut scene, columns[1], y, format!("{}°", row.angle), WHITE, 0.8);
        text(&mut scene, columns[2], y, format!("{} cm", row.distance), WHITE, 0.8);
        text(&mut scene, columns[3], y, row.status.label().to_string(), status_color, 1.0);
        y += line;
    }

    scene.render(canvas, font);
}

// ============================================================================
// FONTS
// ============================================================================

pub fn load_font(path: &Path) -> Result<Font<'static>> {
    let data = std::fs::read(path).map_err(|source| RadarError::FontRead {
        path: path.to_path_buf(),
        source,
    })?;
    Font::try_from_vec(data).ok_or_else(|| RadarError::FontParse(path.to_path_buf()))
}

/// The configured font, else the first system font that loads. Text is
/// simply not drawn when nothing is found.
pub fn discover_font(config: &RadarConfig) -> Option<Font<'static>> {
    if let Some(path) = &config.font_path {
        match load_font(path) {
            Ok(font) => return Some(font),
            Err(e) => log::warn!("{}", e),
        }
    }
    let found = FONT_CANDIDATES
        .iter()
        .map(|path| PathBuf::from(*path))
        .filter(|path| path.exists())
        .find_map(|path| match load_font(&path) {
            Ok(font) => {
                log::debug!("using font {}", path.display());
                Some(font)
            }
            Err(e) => {
                log::debug!("{}", e);
                None
            }
        });
    if found.is_none() {
        log::warn!("no usable font found, labels disabled (pass --font)");
    }
    found
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

/// Extra stroke width and alpha scale of each halo pass under a glowing
/// stroke, widest first.
fn glow_passes(glow: f64) -> Vec<(f64, f32)> {
    if glow <= 0.0 {
        Vec::new()
    } else {
        vec![(glow * 2.0, 0.08), (glow, 0.15)]
    }
}

/// Piecewise linear alpha along `t` in [0, 1].
fn gradient_alpha(stops: &[(f64, f64)], t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return 0.0;
    };
    if t <= first.0 {
        return first.1;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.0 {
            let span = b.0 - a.0;
            let f = if span > 0.0 { (t - a.0) / span } else { 1.0 };
            return a.1 + (b.1 - a.1) * f;
        }
    }
    last.1
}

fn fill_viewport(canvas: &mut Canvas, viewport: Viewport, color: Rgb, alpha: f32) {
    let Some((x0, x1, y0, y1)) = canvas.clip(
        viewport.x as f64,
        (viewport.x + viewport.width as i32 - 1) as f64,
        viewport.y as f64,
        (viewport.y + viewport.height as i32 - 1) as f64,
    ) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            canvas.blend(x, y, color, alpha);
        }
    }
}

fn draw_gradient_line(
    canvas: &mut Canvas,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    thickness: f64,
    taper: f64,
    color: Rgb,
    stops: &[(f64, f64)],
) {
    let pad = thickness.ceil() + 1.0;
    let Some((min_x, max_x, min_y, max_y)) = canvas.clip(
        x0.min(x1) - pad,
        x0.max(x1) + pad,
        y0.min(y1) - pad,
        y0.max(y1) + pad,
    ) else {
        return;
    };
    let dx = x1 - x0;
    let dy = y1 - y0;
    let len_sq = dx * dx + dy * dy;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f64 - x0;
            let py = y as f64 - y0;
            let t = if len_sq > 0.0 {
                ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let lx = x0 + t * dx;
            let ly = y0 + t * dy;
            let dist = ((lx - x as f64).powi(2) + (ly - y as f64).powi(2)).sqrt();
            let local_thickness = thickness * (1.0 - t * taper);
            let aa = (1.0 - (dist - local_thickness / 2.0).clamp(0.0, 1.0)).clamp(0.0, 1.0);
            if aa > 0.01 {
                let alpha = aa * gradient_alpha(stops, t);
                canvas.blend(x, y, color, alpha as f32);
            }
        }
    }
}

/// Stroke a circle of radius `r`, optionally limited to radar angles
/// `from..=to`.
fn stroke_arc(
    canvas: &mut Canvas,
    cx: f64,
    cy: f64,
    r: f64,
    thickness: f64,
    span: Option<(f64, f64)>,
    color: Rgb,
    alpha: f32,
) {
    if r <= 0.0 || alpha <= 0.0 {
        return;
    }
    let half = thickness / 2.0;
    let reach = r + half + 1.0;
    let Some((min_x, max_x, min_y, max_y)) =
        canvas.clip(cx - reach, cx + reach, cy - reach, cy + reach)
    else {
        return;
    };
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            let aa = (half + 0.5 - (dist - r).abs()).clamp(0.0, 1.0);
            if aa <= 0.0 {
                continue;
            }
            if let Some((from, to)) = span {
                let angle = radar_angle(cx, cy, x as f64, y as f64);
                if angle < from || angle > to {
                    continue;
                }
            }
            canvas.blend(x, y, color, alpha * aa as f32);
        }
    }
}

/// Filled disc whose alpha follows `stops` from center to rim.
fn fill_disc(canvas: &mut Canvas, cx: f64, cy: f64, radius: f64, color: Rgb, stops: &[(f64, f64)]) {
    if radius <= 0.0 {
        return;
    }
    let reach = radius + 1.0;
    let Some((min_x, max_x, min_y, max_y)) =
        canvas.clip(cx - reach, cx + reach, cy - reach, cy + reach)
    else {
        return;
    };
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dist = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);
            if coverage > 0.0 {
                let alpha = coverage * gradient_alpha(stops, dist / radius);
                canvas.blend(x, y, color, alpha as f32);
            }
        }
    }
}

/// Pie slice over radar angles `from..=to` with a radial alpha gradient.
fn fill_wedge(
    canvas: &mut Canvas,
    cx: f64,
    cy: f64,
    radius: f64,
    from: f64,
    to: f64,
    color: Rgb,
    stops: &[(f64, f64)],
) {
    if radius <= 0.0 || to <= from {
        return;
    }
    let reach = radius + 1.0;
    let Some((min_x, max_x, min_y, max_y)) =
        canvas.clip(cx - reach, cx + reach, cy - reach, cy + reach)
    else {
        return;
    };
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dist = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);
            if coverage <= 0.0 {
                continue;
            }
            let angle = radar_angle(cx, cy, x as f64, y as f64);
            if angle < from || angle > to {
                continue;
            }
            let alpha = coverage * gradient_alpha(stops, dist / radius);
            canvas.blend(x, y, color, alpha as f32);
        }
    }
}

fn draw_text(
    canvas: &mut Canvas,
    x: i32,
    y: i32,
    text: &str,
    font: &Font,
    scale: Scale,
    color: Rgb,
    alpha: f32,
    anchor: Anchor,
) {
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<PositionedGlyph> = font
        .layout(text, scale, point(0.0, v_metrics.ascent))
        .collect();
    let (min_x, max_x, min_y, max_y) = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(min_x, max_x, min_y, max_y), bb| {
            (
                min_x.min(bb.min.x),
                max_x.max(bb.max.x),
                min_y.min(bb.min.y),
                max_y.max(bb.max.y),
            )
        },
    );
    if min_x >= max_x || min_y >= max_y {
        return;
    }
    let offset_x = match anchor {
        Anchor::Center => x - (max_x - min_x) / 2,
        Anchor::Left => x,
    };
    let offset_y = y - (max_y - min_y) / 2;
    for glyph in glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                let px = offset_x + gx as i32 + bb.min.x - min_x;
                let py = offset_y + gy as i32 + bb.min.y - min_y;
                canvas.blend(px, py, color, v * alpha);
            });
        }
    }
}
