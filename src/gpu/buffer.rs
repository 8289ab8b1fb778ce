// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Typed `wgpu` buffers.

A raw `wgpu::Buffer` is just bytes; nothing stops a buffer meant for
trajectory state from being filled with escape flags.  `Buffer<A>`
remembers its element type and length so that uploads, copies and
read-backs are all in units of `A`.
*/

use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::mpsc;

use crate::error::{Error, Result};

pub struct Buffer<A> {
    buffer: wgpu::Buffer,
    len: u64,
    phantom_data: PhantomData<A>,
}

impl<A: bytemuck::Pod> Buffer<A> {
    pub fn write(&self, queue: &wgpu::Queue, contents: &[A]) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(contents));
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    /// Copy the whole of `self` into `destination`.
    pub fn copy_to(&self, encoder: &mut wgpu::CommandEncoder, destination: &Buffer<A>) {
        encoder.copy_buffer_to_buffer(
            &self.buffer,
            0,
            &destination.buffer,
            0,
            self.len * size_of::<A>() as u64,
        )
    }

    /// Map a `MAP_READ` buffer, block until the device has finished
    /// with it, and copy its contents out.
    pub fn read(&self, device: &wgpu::Device) -> Result<Vec<A>> {
        let slice = self.buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| Error::Readback(e.to_string()))?
            .map_err(|e| Error::Readback(e.to_string()))?;
        let contents = {
            let view = slice.get_mapped_range();
            bytemuck::pod_collect_to_vec::<u8, A>(&view[..])
        };
        self.buffer.unmap();
        Ok(contents)
    }
}

enum Contents<'a> {
    Contents(&'a [u8], u64),
    Size(u64),
}

pub struct Builder<'a, A> {
    label: Option<&'a str>,
    contents: Contents<'a>,
    usage: wgpu::BufferUsages,
    phantom_data: PhantomData<A>,
}

impl<'a, A: bytemuck::Pod> From<&'a [A]> for Builder<'a, A> {
    fn from(value: &'a [A]) -> Self {
        Self {
            label: None,
            contents: Contents::Contents(bytemuck::cast_slice(value), value.len() as u64),
            usage: wgpu::BufferUsages::COPY_DST,
            phantom_data: PhantomData,
        }
    }
}

impl<'a, A: bytemuck::Pod> Builder<'a, A> {
    /// An uninitialised buffer of `len` elements.  Zero-length buffers
    /// cannot be bound, so `len` is rounded up to one.
    pub fn new(len: u64) -> Self {
        Self {
            label: None,
            contents: Contents::Size(len.max(1)),
            usage: wgpu::BufferUsages::COPY_DST,
            phantom_data: PhantomData,
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_usage(mut self, usage: wgpu::BufferUsages) -> Self {
        self.usage |= usage;
        self
    }

    pub fn create(self, device: &wgpu::Device) -> Buffer<A> {
        use wgpu::util::DeviceExt;

        let (buffer, len) = match self.contents {
            Contents::Contents(contents, len) => (
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: self.label,
                    contents,
                    usage: self.usage,
                }),
                len,
            ),
            Contents::Size(len) => (
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: self.label,
                    size: len * size_of::<A>() as u64,
                    usage: self.usage,
                    mapped_at_creation: false,
                }),
                len,
            ),
        };

        Buffer {
            buffer,
            len,
            phantom_data: PhantomData,
        }
    }
}
