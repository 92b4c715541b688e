use crate::error::{EngineError, EngineResult};
use crate::renderer::FrameBuffer;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Destination for composited frames.
pub trait FrameWriter {
    /// Called once, with the size of the first frame, before any frame is written.
    fn begin(&mut self, width: u32, height: u32, fps: u32) -> EngineResult<()>;

    fn write_frame(&mut self, frame: &FrameBuffer) -> EngineResult<()>;

    fn finish(&mut self) -> EngineResult<()>;
}

/// Streams raw RGBA frames into an `ffmpeg` child process.
pub struct FfmpegWriter {
    out_path: PathBuf,
    codec: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl FfmpegWriter {
    pub fn new(out_path: impl Into<PathBuf>, codec: impl Into<String>) -> Self {
        Self {
            out_path: out_path.into(),
            codec: codec.into(),
            child: None,
            stdin: None,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }
}

impl FrameWriter for FfmpegWriter {
    fn begin(&mut self, width: u32, height: u32, fps: u32) -> EngineResult<()> {
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args([
                "-y",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{}x{}", width, height),
                "-r",
                &fps.to_string(),
                "-i",
                "pipe:0",
                "-an",
                "-c:v",
                &self.codec,
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&self.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            EngineError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {}",
                e
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::encode("failed to open ffmpeg stdin"))?;

        tracing::debug!(path = %self.out_path.display(), width, height, fps, "ffmpeg started");
        self.child = Some(child);
        self.stdin = Some(stdin);
        Ok(())
    }

    fn write_frame(&mut self, frame: &FrameBuffer) -> EngineResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(EngineError::encode("ffmpeg writer is not running"));
        };
        stdin
            .write_all(frame.as_bytes())
            .map_err(|e| EngineError::encode(format!("failed to write frame to ffmpeg: {}", e)))
    }

    fn finish(&mut self) -> EngineResult<()> {
        drop(self.stdin.take());
        let Some(child) = self.child.take() else {
            return Ok(());
        };

        let output = child
            .wait_with_output()
            .map_err(|e| EngineError::encode(format!("failed to wait for ffmpeg: {}", e)))?;
        if !output.status.success() {
            return Err(EngineError::encode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Writes `frame_<n>.ppm` files into a directory.
pub struct PpmSequenceWriter {
    dir: PathBuf,
    next: usize,
}

impl PpmSequenceWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next: 0,
        }
    }

    /// ffmpeg `image2` input pattern matching the written files.
    pub fn pattern(&self) -> PathBuf {
        self.dir.join("frame_%d.ppm")
    }
}

impl FrameWriter for PpmSequenceWriter {
    fn begin(&mut self, _width: u32, _height: u32, _fps: u32) -> EngineResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn write_frame(&mut self, frame: &FrameBuffer) -> EngineResult<()> {
        let path = self.dir.join(format!("frame_{}.ppm", self.next));
        frame.save_ppm(&path)?;
        self.next += 1;
        Ok(())
    }

    fn finish(&mut self) -> EngineResult<()> {
        Ok(())
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub frames: Vec<FrameBuffer>,
}

impl FrameWriter for MemoryWriter {
    fn begin(&mut self, _width: u32, _height: u32, _fps: u32) -> EngineResult<()> {
        Ok(())
    }

    fn write_frame(&mut self, frame: &FrameBuffer) -> EngineResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> EngineResult<()> {
        Ok(())
    }
}

/// Appends frames in arrival order to a single stream of constant size.
pub struct VideoSink<W: FrameWriter> {
    writer: W,
    fps: u32,
    size: Option<(u32, u32)>,
    frames: usize,
}

impl<W: FrameWriter> VideoSink<W> {
    pub fn new(writer: W, fps: u32) -> Self {
        Self {
            writer,
            fps,
            size: None,
            frames: 0,
        }
    }

    pub fn push(&mut self, frame: &FrameBuffer) -> EngineResult<()> {
        let dims = frame.dimensions();
        match self.size {
            None => {
                self.writer.begin(dims.0, dims.1, self.fps)?;
                self.size = Some(dims);
            }
            Some(expected) if expected != dims => {
                return Err(EngineError::encode(format!(
                    "frame {} is {}x{}, stream is {}x{}",
                    self.frames, dims.0, dims.1, expected.0, expected.1
                )));
            }
            Some(_) => {}
        }

        self.writer.write_frame(frame)?;
        self.frames += 1;
        Ok(())
    }

    pub fn extend<'f>(&mut self, frames: impl IntoIterator<Item = &'f FrameBuffer>) -> EngineResult<()> {
        for frame in frames {
            self.push(frame)?;
        }
        Ok(())
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Flush the writer and hand it back with the number of frames written.
    pub fn finish(mut self) -> EngineResult<(W, usize)> {
        self.writer.finish()?;
        Ok((self.writer, self.frames))
    }
}
