use crate::domain::value_objects::TranscodeJob;

const VIDEO_CODEC: &str = "libx264";
const PIXEL_FORMAT: &str = "yuv420p";
const COLOR_RANGE: &str = "tv";
const PROFILE: &str = "baseline";
const PRESET: &str = "ultrafast";
const TUNE: &str = "zerolatency";
const KEYFRAME_INTERVAL: u32 = 60;
const BITRATE: &str = "2M";

pub struct FfmpegArgs;

impl FfmpegArgs {
    /// Build the ffmpeg argument list pulling RTSP over TCP and pushing H.264 RTP
    /// Audio is dropped; the RTP payload type and SSRC come from the job so they
    /// match the producer waiting on the plain transport.
    pub fn build(job: &TranscodeJob) -> Vec<String> {
        let keyint = format!("keyint={0}:min-keyint={0}", KEYFRAME_INTERVAL);
        let mut args: Vec<String> = [
            "-rtsp_transport",
            "tcp",
            "-i",
            job.rtsp_url.as_str(),
            "-an",
            "-c:v",
            VIDEO_CODEC,
            "-pix_fmt",
            PIXEL_FORMAT,
            "-color_range",
            COLOR_RANGE,
            "-profile:v",
            PROFILE,
            "-preset",
            PRESET,
            "-tune",
            TUNE,
            "-x264-params",
            keyint.as_str(),
            "-b:v",
            BITRATE,
            "-maxrate",
            BITRATE,
            "-bufsize",
            BITRATE,
            "-f",
            "rtp",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();

        args.push("-payload_type".to_string());
        args.push(job.payload_type.to_string());
        args.push("-ssrc".to_string());
        args.push(job.ssrc.to_string());
        args.push(job.rtp_url());
        args
    }
}
