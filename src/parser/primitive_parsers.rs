use nom::bytes::complete::{tag, take, take_until};
use nom::sequence::terminated;
use nom::{IResult, Parser, number};

pub fn parse_c_string(i: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(take_until("\0"), tag("\0")).parse(i)
}

pub fn parse_i8(i: &[u8]) -> IResult<&[u8], i8> {
    number::complete::be_i8(i)
}

pub fn parse_i16(i: &[u8]) -> IResult<&[u8], i16> {
    number::complete::be_i16(i)
}

pub fn parse_i32(i: &[u8]) -> IResult<&[u8], i32> {
    number::complete::be_i32(i)
}

pub fn parse_i64(i: &[u8]) -> IResult<&[u8], i64> {
    number::complete::be_i64(i)
}

pub fn parse_u16(i: &[u8]) -> IResult<&[u8], u16> {
    number::complete::be_u16(i)
}

pub fn parse_u32(i: &[u8]) -> IResult<&[u8], u32> {
    number::complete::be_u32(i)
}

pub fn parse_u64(i: &[u8]) -> IResult<&[u8], u64> {
    number::complete::be_u64(i)
}

pub fn parse_f32(i: &[u8]) -> IResult<&[u8], f32> {
    number::complete::be_f32(i)
}

pub fn parse_f64(i: &[u8]) -> IResult<&[u8], f64> {
    number::complete::be_f64(i)
}

pub fn parse_u8(i: &[u8]) -> IResult<&[u8], u8> {
    number::complete::be_u8(i)
}

/// Identifier of `id_size` bytes (4 or 8), widened to `u64`.
pub fn parse_id(id_size: u32) -> impl Fn(&[u8]) -> IResult<&[u8], u64> + Copy {
    move |i| {
        if id_size == 4 {
            parse_u32(i).map(|(r, id)| (r, u64::from(id)))
        } else {
            parse_u64(i)
        }
    }
}

pub fn take_bytes(count: usize) -> impl Fn(&[u8]) -> IResult<&[u8], &[u8]> {
    move |i| take(count)(i)
}
