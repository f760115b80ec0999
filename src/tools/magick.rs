//! ImageMagick 7 backend (`magick`).
//!
//! One program covers probing, rasterising, resizing, appending and
//! re-encoding. Every command reads only the first frame/page (`[0]`) of its
//! inputs so multi-page PDFs or animated GIFs cannot multiply the output.

use super::command::{require_program, ToolCommand};
use super::{ExternalTool, ImageProcessor, MetadataReader, ToolResult};
use crate::error::ToolFailure;
use crate::pipeline::encode::OutputEncoding;
use crate::pipeline::inspect::{parse_identify, ImageInfo, IDENTIFY_FORMAT};
use futures::future::BoxFuture;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The `magick` program.
#[derive(Debug, Clone)]
pub struct Magick {
    program: PathBuf,
    timeout: Duration,
}

impl Magick {
    pub fn new(program: &Path, timeout: Duration) -> Self {
        Self {
            program: program.to_path_buf(),
            timeout,
        }
    }

    fn command(&self) -> ToolCommand {
        ToolCommand::new(&self.program, self.timeout).for_tool(ExternalTool::Magick)
    }
}

/// `path[0]`: the first frame or page of `path`.
fn first_frame(path: &Path) -> OsString {
    let mut s = path.as_os_str().to_os_string();
    s.push("[0]");
    s
}

pub(crate) fn identify_args(image: &Path) -> Vec<OsString> {
    vec![
        "identify".into(),
        "-format".into(),
        IDENTIFY_FORMAT.into(),
        first_frame(image),
    ]
}

pub(crate) fn rasterize_args(page: &Path, dpi: u32, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-density".into(),
        dpi.to_string().into(),
        "-units".into(),
        "PixelsPerInch".into(),
        first_frame(page),
    ];
    args.extend(
        ["-background", "white", "-alpha", "remove", "-alpha", "off"]
            .iter()
            .map(OsString::from),
    );
    args.push(out.into());
    args
}

pub(crate) fn resize_args(
    input: &Path,
    width: u32,
    height: u32,
    dpi: u32,
    out: &Path,
) -> Vec<OsString> {
    vec![
        first_frame(input),
        "-resize".into(),
        format!("{width}x{height}!").into(),
        "-density".into(),
        dpi.to_string().into(),
        "-units".into(),
        "PixelsPerInch".into(),
        out.into(),
    ]
}

pub(crate) fn append_args(
    top: &Path,
    bottom: &Path,
    gap: u32,
    encoding: &OutputEncoding,
    out: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![first_frame(top), "(".into(), first_frame(bottom)];
    if gap > 0 {
        args.extend(
            [
                "-background".to_string(),
                "white".into(),
                "-gravity".into(),
                "north".into(),
                "-splice".into(),
                format!("0x{gap}"),
            ]
            .into_iter()
            .map(OsString::from),
        );
    }
    args.push(")".into());
    args.extend(
        ["-background", "white", "-gravity", "center", "-append"]
            .iter()
            .map(OsString::from),
    );
    args.extend(encoding.magick_args().into_iter().map(OsString::from));
    args.push(out.into());
    args
}

pub(crate) fn encode_args(input: &Path, encoding: &OutputEncoding, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![first_frame(input)];
    args.extend(encoding.magick_args().into_iter().map(OsString::from));
    args.push(out.into());
    args
}

impl MetadataReader for Magick {
    fn ensure_available(&self) -> ToolResult<()> {
        require_program(ExternalTool::Magick, &self.program).map(|_| ())
    }

    fn identify<'a>(&'a self, image: &'a Path) -> BoxFuture<'a, ToolResult<ImageInfo>> {
        Box::pin(async move {
            let cmd = self.command().args(identify_args(image));
            let program = cmd.program_name();
            let output = cmd.run().await?;
            parse_identify(&output.stdout)
                .map_err(|detail| ToolFailure::Unparseable { program, detail })
        })
    }
}

impl ImageProcessor for Magick {
    fn ensure_available(&self) -> ToolResult<()> {
        require_program(ExternalTool::Magick, &self.program).map(|_| ())
    }

    fn rasterize<'a>(
        &'a self,
        page: &'a Path,
        dpi: u32,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<()>> {
        Box::pin(async move {
            self.command()
                .args(rasterize_args(page, dpi, out))
                .run()
                .await
                .map(|_| ())
        })
    }

    fn resize<'a>(
        &'a self,
        input: &'a Path,
        width: u32,
        height: u32,
        dpi: u32,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<()>> {
        Box::pin(async move {
            self.command()
                .args(resize_args(input, width, height, dpi, out))
                .run()
                .await
                .map(|_| ())
        })
    }

    fn append<'a>(
        &'a self,
        top: &'a Path,
        bottom: &'a Path,
        gap: u32,
        encoding: &'a OutputEncoding,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<()>> {
        Box::pin(async move {
            self.command()
                .args(append_args(top, bottom, gap, encoding, out))
                .run()
                .await
                .map(|_| ())
        })
    }

    fn encode<'a>(
        &'a self,
        input: &'a Path,
        encoding: &'a OutputEncoding,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<()>> {
        Box::pin(async move {
            self.command()
                .args(encode_args(input, encoding, out))
                .run()
                .await
                .map(|_| ())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn identify_reads_first_frame() {
        let args = strings(identify_args(Path::new("crane.jpg")));
        assert_eq!(args, vec!["identify", "-format", IDENTIFY_FORMAT, "crane.jpg[0]"]);
    }

    #[test]
    fn rasterize_flattens_on_white() {
        let args = strings(rasterize_args(
            Path::new("/s/cropped.pdf"),
            300,
            Path::new("/s/caption.png"),
        ));
        assert_eq!(
            args,
            vec![
                "-density",
                "300",
                "-units",
                "PixelsPerInch",
                "/s/cropped.pdf[0]",
                "-background",
                "white",
                "-alpha",
                "remove",
                "-alpha",
                "off",
                "/s/caption.png"
            ]
        );
    }

    #[test]
    fn resize_forces_exact_geometry() {
        let args = strings(resize_args(
            Path::new("in.png"),
            1500,
            188,
            300,
            Path::new("out.png"),
        ));
        assert!(args.contains(&"1500x188!".to_string()), "{args:?}");
        assert_eq!(args.first().map(String::as_str), Some("in.png[0]"));
        assert_eq!(args.last().map(String::as_str), Some("out.png"));
    }

    #[test]
    fn append_without_gap() {
        let args = strings(append_args(
            Path::new("crane.jpg"),
            Path::new("cap.png"),
            0,
            &OutputEncoding::Jpeg { quality: 92 },
            Path::new("out.jpg"),
        ));
        assert_eq!(
            args,
            vec![
                "crane.jpg[0]",
                "(",
                "cap.png[0]",
                ")",
                "-background",
                "white",
                "-gravity",
                "center",
                "-append",
                "-quality",
                "92",
                "out.jpg"
            ]
        );
    }

    #[test]
    fn append_with_gap_splices_caption_top() {
        let args = strings(append_args(
            Path::new("a.png"),
            Path::new("b.png"),
            12,
            &OutputEncoding::Default,
            Path::new("o.png"),
        ));
        let open = args.iter().position(|a| a == "(").unwrap();
        let close = args.iter().position(|a| a == ")").unwrap();
        let inner = &args[open..close];
        assert!(inner.contains(&"-splice".to_string()));
        assert!(inner.contains(&"0x12".to_string()));
        assert!(inner.contains(&"north".to_string()));
    }

    #[test]
    fn encode_applies_options() {
        let args = strings(encode_args(
            Path::new("cap.png"),
            &OutputEncoding::Png {
                compression_level: 4,
            },
            Path::new("citation.png"),
        ));
        assert_eq!(
            args,
            vec![
                "cap.png[0]",
                "-define",
                "png:compression-level=4",
                "citation.png"
            ]
        );
    }
}
