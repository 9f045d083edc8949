pub mod ffmpeg_camera_source;
pub mod ffmpeg_virtual_camera;
