//! Browser side of the export pipeline: rasterize the job's SVG through an
//! `<img>` onto an offscreen canvas, then download the artifact.

use crate::js_error;
use crate::render2d::css;
use ic_render::export::{ExportArtifact, ExportError, ExportJob, RasterOutcome};
use ic_render::scene::BACKGROUND;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlAnchorElement, HtmlCanvasElement, HtmlImageElement};

/// Start rasterizing `job`. `on_done` receives the delivered artifact or
/// the reason nothing could be downloaded.
pub fn start(
    job: ExportJob,
    on_done: impl FnOnce(Result<ExportArtifact, ExportError>) + 'static,
) -> Result<(), ExportError> {
    let document = document()?;
    let img = HtmlImageElement::new().map_err(|_| ExportError::MissingSurface("image element"))?;
    let src = job.svg_data_uri();

    // Exactly one of onload/onerror fires; whichever does takes the job.
    let job = Rc::new(RefCell::new(Some(job)));
    let on_done: Rc<RefCell<Option<Box<dyn FnOnce(Result<ExportArtifact, ExportError>)>>>> =
        Rc::new(RefCell::new(Some(Box::new(on_done))));

    let resolve = {
        let job = Rc::clone(&job);
        let on_done = Rc::clone(&on_done);
        let document = document.clone();
        move |decoded: Option<&HtmlImageElement>| {
            let (Some(job), Some(done)) = (job.borrow_mut().take(), on_done.borrow_mut().take()) else {
                return;
            };
            let outcome = match decoded {
                Some(img) => match rasterize(&document, img, &job) {
                    Ok(url) => RasterOutcome::Encoded(url),
                    Err(e) => RasterOutcome::Failed(e),
                },
                None => RasterOutcome::Failed("could not decode chart image".into()),
            };
            let artifact = job.finish(outcome);
            done(deliver(&document, &artifact).map(|()| artifact));
        }
    };
    let resolve = Rc::new(resolve);

    let onload = {
        let resolve = Rc::clone(&resolve);
        let img = img.clone();
        Closure::once_into_js(move || (*resolve)(Some(&img)))
    };
    let onerror = Closure::once_into_js(move || (*resolve)(None));
    img.set_onload(Some(onload.unchecked_ref()));
    img.set_onerror(Some(onerror.unchecked_ref()));
    img.set_src(&src);
    Ok(())
}

pub fn document() -> Result<Document, ExportError> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or(ExportError::MissingSurface("document"))
}

fn rasterize(document: &Document, img: &HtmlImageElement, job: &ExportJob) -> Result<String, String> {
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| "not a canvas".to_string())?;
    let (w, h) = job.raster_size();
    canvas.set_width(w);
    canvas.set_height(h);

    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(js_error)?
        .ok_or("no 2d context")?
        .dyn_into()
        .map_err(|_| "not a 2d context".to_string())?;

    ctx.set_fill_style_str(&css(BACKGROUND));
    ctx.fill_rect(0.0, 0.0, w as f64, h as f64);
    ctx.scale(job.pixel_ratio, job.pixel_ratio).map_err(js_error)?;
    let frame = job.frame();
    ctx.draw_image_with_html_image_element_and_dw_and_dh(img, 0.0, 0.0, frame.width, frame.height)
        .map_err(js_error)?;
    canvas.to_data_url().map_err(js_error)
}

/// Click a temporary download link for the artifact.
fn deliver(document: &Document, artifact: &ExportArtifact) -> Result<(), ExportError> {
    let fail = |e: JsValue| ExportError::Raster(js_error(e));
    let body = document.body().ok_or(ExportError::MissingSurface("document body"))?;
    let link: HtmlAnchorElement = document
        .create_element("a")
        .map_err(fail)?
        .dyn_into()
        .map_err(|_| ExportError::MissingSurface("anchor element"))?;
    link.set_href(artifact.data_url());
    link.set_download(artifact.filename());
    body.append_child(&link).map_err(fail)?;
    link.click();
    body.remove_child(&link).map_err(fail)?;
    log::debug!("downloaded {}", artifact.filename());
    Ok(())
}
