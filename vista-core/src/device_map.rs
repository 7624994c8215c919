use std::{fmt, str::FromStr};

/// Compute target requested through configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceMap {
    ForceCpu,
    Cuda(usize),
    Metal(usize),
}

impl DeviceMap {
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, DeviceMap::ForceCpu)
    }
}

impl Default for DeviceMap {
    fn default() -> Self {
        Self::Cuda(0)
    }
}

impl FromStr for DeviceMap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (kind, ordinal) = match lower.split_once(':') {
            Some((kind, ordinal)) => {
                let ordinal = ordinal
                    .parse::<usize>()
                    .map_err(|_| format!("invalid device ordinal in `{s}`"))?;
                (kind, ordinal)
            }
            None => (lower.as_str(), 0),
        };

        match kind {
            "cpu" if ordinal == 0 => Ok(DeviceMap::ForceCpu),
            "cuda" | "gpu" => Ok(DeviceMap::Cuda(ordinal)),
            "metal" | "mps" => Ok(DeviceMap::Metal(ordinal)),
            _ => Err(format!(
                "unknown device `{s}`, expected cpu, cuda[:N] or metal[:N]"
            )),
        }
    }
}

impl fmt::Display for DeviceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMap::ForceCpu => write!(f, "cpu"),
            DeviceMap::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
            DeviceMap::Metal(ordinal) => write!(f, "metal:{ordinal}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_names() {
        assert_eq!("cpu".parse::<DeviceMap>().unwrap(), DeviceMap::ForceCpu);
        assert_eq!("cuda".parse::<DeviceMap>().unwrap(), DeviceMap::Cuda(0));
        assert_eq!("CUDA:1".parse::<DeviceMap>().unwrap(), DeviceMap::Cuda(1));
        assert_eq!("mps".parse::<DeviceMap>().unwrap(), DeviceMap::Metal(0));
        assert_eq!(" metal:2 ".parse::<DeviceMap>().unwrap(), DeviceMap::Metal(2));
    }

    #[test]
    fn rejects_unknown_devices() {
        assert!("tpu".parse::<DeviceMap>().is_err());
        assert!("cuda:x".parse::<DeviceMap>().is_err());
        assert!("cpu:1".parse::<DeviceMap>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for device in [DeviceMap::ForceCpu, DeviceMap::Cuda(3), DeviceMap::Metal(0)] {
            assert_eq!(device.to_string().parse::<DeviceMap>().unwrap(), device);
        }
    }

    #[test]
    fn defaults_to_first_cuda_device() {
        assert_eq!(DeviceMap::default(), DeviceMap::Cuda(0));
        assert!(DeviceMap::default().is_accelerator());
        assert!(!DeviceMap::ForceCpu.is_accelerator());
    }
}
