mod download;
mod filename;

pub use download::{DownloadResult, download_episode, download_with_retry};
pub use filename::{
    audio_extension, audio_filename, cleaned_audio_filename, episode_stem, processed_txt_filename,
    srt_filename, txt_filename,
};
