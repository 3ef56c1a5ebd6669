use std::{path::PathBuf, sync::Arc, thread, time::Instant};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use gpui::{
    App, AppContext, Bounds, RenderImage, TitlebarOptions, WindowBounds, WindowOptions, px, size,
};
use gpui_component::Root;

use crate::{
    config::Args,
    pipeline::{
        CameraStream, RecognizerBackend, RecognizerMessage, start_camera_stream, start_recognizer,
    },
    render::Renderer,
    scene::{LoadedPhoto, Scene, photo::spawn_photo_loader},
};

use self::status::{StatusLevel, StatusLine};

mod render_util;
mod scene_view;
mod status;

/// Recognizer messages buffered between UI frames before the worker blocks.
const MESSAGE_QUEUE: usize = 8;

pub fn launch_ui(app: &mut App, args: Args) -> gpui::Result<()> {
    let render_cfg = args.render_config();
    let bounds = Bounds::centered(
        None,
        size(px(render_cfg.width as f32), px(render_cfg.height as f32 + 48.0)),
        app,
    );
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Gesture Tree".into()),
            ..Default::default()
        }),
        window_bounds: Some(WindowBounds::Windowed(bounds)),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| AppView::new(&args));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    scene: Scene,
    renderer: Renderer,
    started: Instant,
    status: StatusLine,
    msg_rx: Option<Receiver<RecognizerMessage>>,
    camera: Option<CameraStream>,
    _recognizer: Option<thread::JoinHandle<()>>,
    photo_tx: Sender<LoadedPhoto>,
    photo_rx: Receiver<LoadedPhoto>,
    photo_max_side: u32,
    scene_image: Option<Arc<RenderImage>>,
    preview_image: Option<Arc<RenderImage>>,
}

impl AppView {
    fn new(args: &Args) -> Self {
        let scene_cfg = args.scene_config();
        let photo_max_side = scene_cfg.photo_texture_size;
        let (photo_tx, photo_rx) = unbounded();
        if !args.photos.is_empty() {
            spawn_photo_loader(args.photos.clone(), photo_max_side, photo_tx.clone());
        }

        let mut view = Self {
            scene: Scene::new(scene_cfg, args.seed),
            renderer: Renderer::new(args.render_config()),
            started: Instant::now(),
            status: StatusLine::new(StatusLevel::Loading, "Starting camera..."),
            msg_rx: None,
            camera: None,
            _recognizer: None,
            photo_tx,
            photo_rx,
            photo_max_side,
            scene_image: None,
            preview_image: None,
        };

        if args.no_camera {
            view.status = StatusLine::new(
                StatusLevel::Warning,
                "Camera disabled, gestures are off",
            );
        } else {
            view.start_tracking(args);
        }
        view
    }

    /// Opens the camera and hands its frames to a recognizer worker.
    fn start_tracking(&mut self, args: &Args) {
        let (frame_tx, frame_rx) = bounded(1);
        let camera = match start_camera_stream(args.camera, frame_tx) {
            Ok(camera) => camera,
            Err(err) => {
                log::error!("camera unavailable: {err}");
                self.status.on_error(&err);
                return;
            }
        };
        log::info!("camera {} streaming", camera.device().label);
        self.status = StatusLine::new(StatusLevel::Loading, "Preparing hand tracking models...");

        let (msg_tx, msg_rx) = bounded(MESSAGE_QUEUE);
        let backend = RecognizerBackend::new(&args.model_dir);
        self._recognizer = Some(start_recognizer(backend, frame_rx, msg_tx));
        self.msg_rx = Some(msg_rx);
        self.camera = Some(camera);
    }

    fn load_photos(&self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        spawn_photo_loader(paths, self.photo_max_side, self.photo_tx.clone());
    }
}
