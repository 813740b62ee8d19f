// awsio: AWS service-call engine for Rust
// Copyright 2024 the awsio authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! AWS regions and partitions

use std::fmt;
use std::str::FromStr;

use crate::aws::error::Error;

/// The default AWS region to be used if no other region is specified.
pub const DEFAULT_REGION: Region = Region::UsEast1;

/// A disjoint cloud. Each partition has its own DNS suffix and, for some
/// services, a default global endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Partition {
    Aws,
    AwsCn,
    AwsUsGov,
}

impl Partition {
    /// The DNS suffix of endpoints in this partition.
    pub fn domain(self) -> &'static str {
        match self {
            Partition::Aws | Partition::AwsUsGov => "amazonaws.com",
            Partition::AwsCn => "amazonaws.com.cn",
        }
    }
}

macro_rules! regions {
    ($(($variant:ident, $id:literal, $partition:ident),)*) => {
        /// Closed enumeration of AWS region identifiers.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Region {
            $($variant,)*
        }

        impl Region {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Region::$variant => $id,)*
                }
            }

            pub fn partition(self) -> Partition {
                match self {
                    $(Region::$variant => Partition::$partition,)*
                }
            }
        }

        impl FromStr for Region {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                match s {
                    $($id => Ok(Region::$variant),)*
                    _ => Err(Error::UnknownRegion(s.to_string())),
                }
            }
        }
    };
}

regions! {
    (AfSouth1, "af-south-1", Aws),
    (ApEast1, "ap-east-1", Aws),
    (ApNortheast1, "ap-northeast-1", Aws),
    (ApNortheast2, "ap-northeast-2", Aws),
    (ApNortheast3, "ap-northeast-3", Aws),
    (ApSouth1, "ap-south-1", Aws),
    (ApSoutheast1, "ap-southeast-1", Aws),
    (ApSoutheast2, "ap-southeast-2", Aws),
    (CaCentral1, "ca-central-1", Aws),
    (EuCentral1, "eu-central-1", Aws),
    (EuNorth1, "eu-north-1", Aws),
    (EuSouth1, "eu-south-1", Aws),
    (EuWest1, "eu-west-1", Aws),
    (EuWest2, "eu-west-2", Aws),
    (EuWest3, "eu-west-3", Aws),
    (MeSouth1, "me-south-1", Aws),
    (SaEast1, "sa-east-1", Aws),
    (UsEast1, "us-east-1", Aws),
    (UsEast2, "us-east-2", Aws),
    (UsWest1, "us-west-1", Aws),
    (UsWest2, "us-west-2", Aws),
    (CnNorth1, "cn-north-1", AwsCn),
    (CnNorthwest1, "cn-northwest-1", AwsCn),
    (UsGovEast1, "us-gov-east-1", AwsUsGov),
    (UsGovWest1, "us-gov-west-1", AwsUsGov),
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the effective region: explicit choice first, then a partition
/// endpoint that is itself a region identifier, then `AWS_DEFAULT_REGION`,
/// then `us-east-1`.
pub fn resolve_region(explicit: Option<Region>, partition_endpoint: Option<&str>) -> Region {
    if let Some(region) = explicit {
        return region;
    }
    if let Some(region) = partition_endpoint.and_then(|p| Region::from_str(p).ok()) {
        return region;
    }
    if let Some(region) = std::env::var("AWS_DEFAULT_REGION")
        .ok()
        .and_then(|v| Region::from_str(&v).ok())
    {
        return region;
    }
    DEFAULT_REGION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_round_trip() {
        for id in ["us-east-1", "eu-west-2", "cn-north-1", "us-gov-west-1"] {
            let region: Region = id.parse().unwrap();
            assert_eq!(region.to_string(), id);
        }
    }

    #[test]
    fn test_unknown_region_is_rejected() {
        assert!(matches!(
            "mars-central-1".parse::<Region>(),
            Err(Error::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_partitions() {
        assert_eq!(Region::UsEast1.partition(), Partition::Aws);
        assert_eq!(Region::CnNorthwest1.partition(), Partition::AwsCn);
        assert_eq!(Region::UsGovEast1.partition(), Partition::AwsUsGov);
        assert_eq!(Partition::AwsCn.domain(), "amazonaws.com.cn");
    }

    #[test]
    fn test_explicit_region_wins() {
        assert_eq!(
            resolve_region(Some(Region::EuWest1), Some("us-west-2")),
            Region::EuWest1
        );
        assert_eq!(
            resolve_region(None, Some("us-west-2")),
            Region::UsWest2
        );
    }
}
