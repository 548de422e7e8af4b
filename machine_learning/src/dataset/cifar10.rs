use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use ndarray::{Array1, Array4};

use super::{DatasetProvider, RawSplit};
use crate::{MlErr, Result};

pub const CHANNELS: usize = 3;
pub const SIDE: usize = 32;
pub const CLASSES: usize = 10;

/// One label byte followed by the channel major pixels of a single image.
const RECORD: usize = 1 + CHANNELS * SIDE * SIDE;

const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILE: &str = "test_batch.bin";

/// Reads the binary distribution of CIFAR-10 (the `cifar-10-batches-bin` directory) from disk.
#[derive(Debug, Clone)]
pub struct Cifar10 {
    dir: PathBuf,
}

impl Cifar10 {
    /// Creates a new `Cifar10` provider.
    ///
    /// # Arguments
    /// * `dir` - The directory holding `data_batch_{1..5}.bin` and `test_batch.bin`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn read_split(&self, files: &[&str]) -> Result<RawSplit> {
        let mut labels = Vec::new();
        let mut pixels = Vec::new();

        for file in files {
            let path = self.dir.join(file);
            let bytes = fs::read(&path)?;

            if bytes.is_empty() || !bytes.len().is_multiple_of(RECORD) {
                return Err(MlErr::InvalidDataset(format!(
                    "{} holds {} bytes, not a whole number of {RECORD} byte records",
                    path.display(),
                    bytes.len()
                )));
            }

            for record in bytes.chunks_exact(RECORD) {
                labels.push(record[0]);
                pixels.extend_from_slice(&record[1..]);
            }

            debug!("read {} images from {}", bytes.len() / RECORD, path.display());
        }

        let images = Array4::from_shape_vec((labels.len(), CHANNELS, SIDE, SIDE), pixels)?;
        RawSplit::new(images, Array1::from_vec(labels))
    }
}

impl DatasetProvider for Cifar10 {
    fn load(&self) -> Result<(RawSplit, RawSplit)> {
        let train = self.read_split(&TRAIN_FILES)?;
        let test = self.read_split(&[TEST_FILE])?;
        Ok((train, test))
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    /// A scratch directory unique to this process and test.
    fn scratch(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("cifar10-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut record = vec![fill; RECORD];
        record[0] = label;
        record
    }

    fn write_batches(dir: &Path, per_file: usize) {
        for (i, file) in TRAIN_FILES.iter().chain([&TEST_FILE]).enumerate() {
            let bytes: Vec<u8> = (0..per_file)
                .flat_map(|j| record(((i + j) % CLASSES) as u8, i as u8))
                .collect();
            fs::write(dir.join(file), bytes).unwrap();
        }
    }

    #[test]
    fn reads_every_batch() {
        let dir = scratch("reads");
        write_batches(&dir, 2);

        let (train, test) = Cifar10::new(&dir).load().unwrap();

        assert_eq!(train.len(), 10);
        assert_eq!(test.len(), 2);
        assert_eq!(train.images.dim(), (10, CHANNELS, SIDE, SIDE));
        assert_eq!(train.labels.to_vec(), [0, 1, 1, 2, 2, 3, 3, 4, 4, 5]);
        // every image of the third file is filled with its index
        let third = train.images.outer_iter().skip(4).take(2);
        assert!(third.flat_map(|img| img.into_iter()).all(|&p| p == 2));
        assert_eq!(test.labels.to_vec(), [5, 6]);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn keeps_channel_major_layout() {
        let dir = scratch("layout");
        write_batches(&dir, 1);

        let mut bytes = record(3, 0);
        // second channel, row 1, column 2
        bytes[1 + SIDE * SIDE + SIDE + 2] = 200;
        fs::write(dir.join(TEST_FILE), bytes).unwrap();

        let (_, test) = Cifar10::new(&dir).load().unwrap();
        assert_eq!(test.images[[0, 1, 1, 2]], 200);
        assert_eq!(test.labels[0], 3);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn truncated_files_are_rejected() {
        let dir = scratch("truncated");
        write_batches(&dir, 1);
        fs::write(dir.join(TEST_FILE), vec![0; RECORD - 1]).unwrap();

        let err = Cifar10::new(&dir).load().unwrap_err();
        assert!(matches!(err, MlErr::InvalidDataset(_)));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let err = Cifar10::new("/nonexistent/cifar10").load().unwrap_err();
        assert!(matches!(err, MlErr::Io(_)));
    }
}
